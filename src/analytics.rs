// =============================================================================
// ANALYTICS MODULE
// =============================================================================
// Folds a storefront snapshot into the dashboard report.
//
// Every section is a single pass over already-loaded records:
// - sales:      revenue totals, status split, 7-day trend
// - inventory:  stock valuation, margin, shrinkage
// - products:   best sellers and turnover
// - customers:  distinct buyers, retention, lifetime value
// - marketing:  coupon redemptions and discount impact
// - operations: fulfillment rate, backlog, stock activity
// - profit:     COGS and gross margin
//
// LEARNING NOTES:
// - These functions only borrow the snapshot (&Snapshot), so the caller keeps
//   ownership and the compiler guarantees nothing here mutates the input.
// - `now` is passed in rather than read from the clock, so the 24h/30d/7-day
//   windows agree with each other and tests are deterministic.
// =============================================================================

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::*;

/// Days covered by the revenue trend, ending today
pub const TREND_DAYS: i64 = 7;

/// Window for counting a profile as a new customer
pub const NEW_CUSTOMER_DAYS: i64 = 30;

/// Window for recent inventory activity
pub const RECENT_ACTIVITY_HOURS: i64 = 24;

/// Length of the best-seller and top-coupon lists
pub const TOP_N: usize = 5;

/// Label for order lines whose product was removed from the catalog
pub const UNKNOWN_PRODUCT: &str = "Unknown";

// =============================================================================
// ENTRY POINT
// =============================================================================
/// Compute the full analytics report.
///
/// Pure and infallible: missing numbers count as zero, every ratio with a
/// zero denominator is zero, and references to deleted records are labelled
/// rather than dropped.
pub fn compute_analytics(snapshot: &Snapshot, now: DateTime<Utc>) -> AnalyticsReport {
    let sales = sales(&snapshot.orders, now);
    let inventory = inventory(
        &snapshot.inventory_items,
        &snapshot.inventory_logs,
        &snapshot.products,
    );
    let products = products(&snapshot.orders, &snapshot.products);
    let customers = customers(&snapshot.orders, &snapshot.customers, sales.total_revenue, now);
    let marketing = marketing(&snapshot.orders, &snapshot.coupons);
    let operations = operations(&snapshot.orders, &snapshot.inventory_logs, now);
    let profit = profit(&snapshot.orders, sales.net_revenue);

    tracing::debug!(
        orders = snapshot.orders.len(),
        inventory_items = snapshot.inventory_items.len(),
        total_revenue = sales.total_revenue,
        "Analytics report computed"
    );

    AnalyticsReport {
        sales,
        inventory,
        products,
        customers,
        marketing,
        operations,
        profit,
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn percent(numerator: f64, denominator: f64) -> f64 {
    ratio(numerator, denominator) * 100.0
}

// =============================================================================
// SALES
// =============================================================================
pub fn sales(orders: &[Order], now: DateTime<Utc>) -> SalesSection {
    let mut revenue_by_status: BTreeMap<OrderStatus, f64> =
        OrderStatus::ALL.iter().map(|status| (*status, 0.0)).collect();

    // Day buckets keyed by UTC calendar date
    let today = now.date_naive();
    let mut trend: BTreeMap<NaiveDate, TrendPoint> = (0..TREND_DAYS)
        .rev()
        .map(|days_ago| today - Duration::days(days_ago))
        .map(|date| {
            (
                date,
                TrendPoint {
                    date,
                    revenue: 0.0,
                    orders: 0,
                },
            )
        })
        .collect();

    let mut total_revenue = 0.0;
    let mut net_revenue = 0.0;
    let mut shipping_revenue = 0.0;

    for order in orders {
        total_revenue += order.total();
        net_revenue += order.subtotal();
        shipping_revenue += order.shipping();

        *revenue_by_status.entry(order.status).or_insert(0.0) += order.total();

        if let Some(point) = trend.get_mut(&order.created_at.date_naive()) {
            point.revenue += order.total();
            point.orders += 1;
        }
    }

    let order_count = orders.len() as u64;

    SalesSection {
        total_revenue,
        net_revenue,
        shipping_revenue,
        order_count,
        average_order_value: ratio(total_revenue, order_count as f64),
        revenue_by_status,
        trend: trend.into_values().collect(),
    }
}

// =============================================================================
// INVENTORY
// =============================================================================
pub fn inventory(
    items: &[InventoryItem],
    logs: &[InventoryLog],
    products: &[Product],
) -> InventorySection {
    let mut total_valuation_cost = 0.0;
    let mut total_valuation_retail = 0.0;
    let mut low_stock_count = 0;
    let mut out_of_stock_count = 0;

    for item in items {
        let stock = item.stock() as f64;
        total_valuation_cost += stock * item.cost_price();
        total_valuation_retail += stock * item.selling_price();

        if item.is_low_stock() {
            low_stock_count += 1;
        }
        if item.is_out_of_stock() {
            out_of_stock_count += 1;
        }
    }

    InventorySection {
        total_valuation_cost,
        total_valuation_retail,
        projected_margin: percent(
            total_valuation_retail - total_valuation_cost,
            total_valuation_retail,
        ),
        low_stock_count,
        out_of_stock_count,
        shrinkage_value: shrinkage(items, logs, products),
        total_items: items.len() as u64,
    }
}

/// Cost of stock removed for reasons other than orders (damage, loss,
/// miscounts). A log is matched to an inventory item directly by id, or
/// through the product that references the item. Unmatched logs add nothing.
fn shrinkage(items: &[InventoryItem], logs: &[InventoryLog], products: &[Product]) -> f64 {
    let items_by_id: HashMap<&str, &InventoryItem> =
        items.iter().map(|item| (item.id.as_str(), item)).collect();

    let items_by_product: HashMap<&str, &InventoryItem> = products
        .iter()
        .filter_map(|product| {
            let item_id = product.inventory_item_id.as_deref()?;
            let item = items_by_id.get(item_id)?;
            Some((product.id.as_str(), *item))
        })
        .collect();

    logs.iter()
        .filter(|log| log.change_amount() < 0 && !log.is_order_attributed())
        .filter_map(|log| {
            let item = items_by_id
                .get(log.item_id.as_str())
                .or_else(|| items_by_product.get(log.item_id.as_str()))?;
            Some(log.change_amount().unsigned_abs() as f64 * item.cost_price())
        })
        // Sum::sum on an empty f64 iterator is -0.0
        .fold(0.0, |total, value| total + value)
}

// =============================================================================
// PRODUCTS
// =============================================================================
/// Per-product sales in first-seen order
pub fn product_performance(orders: &[Order], catalog: &[Product]) -> Vec<ProductPerformance> {
    let names: HashMap<&str, &str> = catalog
        .iter()
        .map(|product| (product.id.as_str(), product.name.as_str()))
        .collect();

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut performance: Vec<ProductPerformance> = Vec::new();

    for item in orders.iter().flat_map(|order| &order.items) {
        let slot = *index.entry(item.product_id.as_str()).or_insert_with(|| {
            performance.push(ProductPerformance {
                product_id: item.product_id.clone(),
                name: names
                    .get(item.product_id.as_str())
                    .copied()
                    .unwrap_or(UNKNOWN_PRODUCT)
                    .to_string(),
                quantity_sold: 0,
                revenue: 0.0,
            });
            performance.len() - 1
        });

        performance[slot].quantity_sold += item.quantity();
        performance[slot].revenue += item.line_revenue();
    }

    performance
}

pub fn products(orders: &[Order], catalog: &[Product]) -> ProductsSection {
    let performance = product_performance(orders, catalog);
    let total_units_sold: i64 = performance.iter().map(|p| p.quantity_sold).sum();
    let total_stock: i64 = catalog.iter().map(Product::stock).sum();

    // sort_by is stable: equal quantities keep first-seen order
    let mut top_products: Vec<ProductPerformance> = performance
        .into_iter()
        .filter(|p| p.quantity_sold > 0)
        .collect();
    top_products.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));
    top_products.truncate(TOP_N);

    ProductsSection {
        top_products,
        total_units_sold,
        turnover_rate: ratio(total_units_sold as f64, total_stock as f64),
    }
}

// =============================================================================
// CUSTOMERS
// =============================================================================
/// Buyer segmentation keyed by normalized email.
///
/// `new_customers` counts profiles created in the last 30 days whose role is
/// `customer`; admin profiles are staff accounts and are left out.
pub fn customers(
    orders: &[Order],
    profiles: &[CustomerProfile],
    total_revenue: f64,
    now: DateTime<Utc>,
) -> CustomersSection {
    let mut orders_per_email: HashMap<String, u64> = HashMap::new();
    for email in orders.iter().filter_map(Order::email_key) {
        *orders_per_email.entry(email).or_insert(0) += 1;
    }

    let registered_emails: HashSet<String> = profiles
        .iter()
        .filter_map(|profile| email_key(&profile.email))
        .collect();

    let unique_customers = orders_per_email.len() as u64;
    let returning = orders_per_email.values().filter(|count| **count > 1).count();
    let registered_customers = orders_per_email
        .keys()
        .filter(|email| registered_emails.contains(*email))
        .count() as u64;

    let window_start = now - Duration::days(NEW_CUSTOMER_DAYS);
    let new_customers = profiles
        .iter()
        .filter(|profile| profile.role == Role::Customer)
        .filter(|profile| profile.created_at >= window_start && profile.created_at <= now)
        .count() as u64;

    CustomersSection {
        unique_customers,
        new_customers,
        returning_rate: percent(returning as f64, unique_customers as f64),
        customer_lifetime_value: ratio(total_revenue, unique_customers as f64),
        registered_customers,
        guest_customers: unique_customers - registered_customers,
    }
}

// =============================================================================
// MARKETING
// =============================================================================
/// Coupon impact, measured from redemptions recorded on orders
pub fn marketing(orders: &[Order], coupons: &[Coupon]) -> MarketingSection {
    let mut top_coupons: Vec<CouponUsage> = Vec::new();
    let mut total_discount = 0.0;
    let mut gross_revenue = 0.0;

    for order in orders {
        total_discount += order.discount_total();
        gross_revenue += order.gross_total();

        if let Some(code) = order.coupon() {
            match top_coupons.iter().position(|usage| usage.code == code) {
                Some(slot) => top_coupons[slot].uses += 1,
                None => top_coupons.push(CouponUsage { code, uses: 1 }),
            }
        }
    }

    let coupon_orders: u64 = top_coupons.iter().map(|usage| usage.uses).sum();
    let discount_impact = if coupon_orders == 0 {
        0.0
    } else {
        percent(total_discount, gross_revenue)
    };

    top_coupons.sort_by(|a, b| b.uses.cmp(&a.uses));
    top_coupons.truncate(TOP_N);

    MarketingSection {
        coupon_orders,
        top_coupons,
        total_discount,
        discount_impact,
        active_coupons: coupons.iter().filter(|coupon| coupon.is_active).count() as u64,
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================
pub fn operations(orders: &[Order], logs: &[InventoryLog], now: DateTime<Utc>) -> OperationsSection {
    let fulfilled = orders.iter().filter(|o| o.status.is_fulfilled()).count();
    let backlog = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Pending)
        .count() as u64;

    let window_start = now - Duration::hours(RECENT_ACTIVITY_HOURS);
    let recent_activity = logs
        .iter()
        .filter(|log| log.created_at >= window_start && log.created_at <= now)
        .count() as u64;

    OperationsSection {
        fulfillment_rate: percent(fulfilled as f64, orders.len() as f64),
        backlog,
        recent_activity,
    }
}

// =============================================================================
// PROFIT
// =============================================================================
/// Gross profit from cost snapshots on order lines.
///
/// Lines without a cost snapshot count as zero cost, so `total_cogs` is a
/// lower bound whenever `is_estimate` is set.
pub fn profit(orders: &[Order], net_revenue: f64) -> ProfitSection {
    let lines = orders.iter().flat_map(|order| &order.items);

    let mut total_cogs = 0.0;
    let mut lines_missing_cost = 0;
    for line in lines {
        if line.cost_price.is_none() {
            lines_missing_cost += 1;
        }
        total_cogs += line.line_cost();
    }

    let gross_profit = net_revenue - total_cogs;

    ProfitSection {
        total_cogs,
        gross_profit,
        gross_margin: percent(gross_profit, net_revenue),
        profit_per_order: ratio(gross_profit, orders.len() as f64),
        lines_missing_cost,
        is_estimate: lines_missing_cost > 0,
    }
}

// =============================================================================
// DATA QUALITY
// =============================================================================
/// Count of numeric fields that were absent and read as zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataQuality {
    pub missing_numeric_fields: u64,
}

impl DataQuality {
    pub fn scan(snapshot: &Snapshot) -> Self {
        fn missing<T>(fields: &[&Option<T>]) -> u64 {
            fields.iter().filter(|field| field.is_none()).count() as u64
        }

        let mut count = 0;

        for order in &snapshot.orders {
            count += missing(&[&order.subtotal, &order.shipping, &order.discount_total, &order.total]);
            for item in &order.items {
                // cost_price is reported separately by the profit section
                count += missing(&[&item.quantity]) + missing(&[&item.price]);
            }
        }
        // Product.price and the coupon numbers feed no figure in the report
        for product in &snapshot.products {
            count += missing(&[&product.stock]);
        }
        for item in &snapshot.inventory_items {
            count += missing(&[&item.cost_price, &item.selling_price]);
            count += missing(&[&item.stock, &item.reorder_level]);
        }
        for log in &snapshot.inventory_logs {
            count += missing(&[&log.change_amount]);
        }

        Self {
            missing_numeric_fields: count,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.missing_numeric_fields == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap()
    }

    fn line(product_id: &str, quantity: i64, price: f64) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            variant_id: None,
            quantity: Some(quantity),
            price: Some(price),
            cost_price: None,
        }
    }

    fn order(id: &str, total: f64) -> Order {
        Order {
            id: id.to_string(),
            customer_email: None,
            customer_name: None,
            items: vec![],
            subtotal: Some(total),
            shipping: Some(0.0),
            discount_total: Some(0.0),
            coupon_code: None,
            total: Some(total),
            status: OrderStatus::Pending,
            payment_method: None,
            payment_status: None,
            created_at: now(),
        }
    }

    fn product(id: &str, name: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            category: None,
            brand: None,
            price: Some(100.0),
            stock: Some(stock),
            variants: vec![],
            inventory_item_id: None,
        }
    }

    fn item(id: &str, stock: i64, cost: f64, selling: f64, reorder: i64) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            sku: format!("SKU-{}", id),
            name: id.to_string(),
            cost_price: Some(cost),
            selling_price: Some(selling),
            stock: Some(stock),
            reorder_level: Some(reorder),
            supplier: None,
        }
    }

    fn log(item_id: &str, change: i64, reason: &str, created_at: DateTime<Utc>) -> InventoryLog {
        InventoryLog {
            id: format!("log-{}", item_id),
            item_id: item_id.to_string(),
            change_amount: Some(change),
            reason: reason.to_string(),
            created_at,
        }
    }

    fn profile(email: &str, role: Role, created_at: DateTime<Utc>) -> CustomerProfile {
        CustomerProfile {
            id: email.to_string(),
            email: email.to_string(),
            full_name: None,
            role,
            created_at,
        }
    }

    // -------------------------------------------------------------------------
    // EMPTY INPUT
    // -------------------------------------------------------------------------
    #[test]
    fn test_empty_snapshot_yields_zeroed_report() {
        let report = compute_analytics(&Snapshot::default(), now());

        assert_eq!(report.sales.total_revenue, 0.0);
        assert_eq!(report.sales.average_order_value, 0.0);
        assert_eq!(report.sales.trend.len(), 7);
        assert!(report.sales.trend.iter().all(|p| p.revenue == 0.0 && p.orders == 0));
        assert!(report.sales.revenue_by_status.values().all(|v| *v == 0.0));

        assert_eq!(report.inventory.projected_margin, 0.0);
        assert_eq!(report.inventory.total_items, 0);
        assert_eq!(report.inventory.shrinkage_value, 0.0);

        assert!(report.products.top_products.is_empty());
        assert_eq!(report.products.turnover_rate, 0.0);

        assert_eq!(report.customers.unique_customers, 0);
        assert_eq!(report.customers.returning_rate, 0.0);
        assert_eq!(report.customers.customer_lifetime_value, 0.0);

        assert!(report.marketing.top_coupons.is_empty());
        assert_eq!(report.marketing.discount_impact, 0.0);

        assert_eq!(report.operations.fulfillment_rate, 0.0);
        assert_eq!(report.operations.backlog, 0);

        assert_eq!(report.profit.gross_margin, 0.0);
        assert_eq!(report.profit.profit_per_order, 0.0);
        assert!(!report.profit.is_estimate);

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("-0.0"), "negative zero in {}", json);
    }

    // -------------------------------------------------------------------------
    // SALES
    // -------------------------------------------------------------------------
    #[test]
    fn test_total_revenue_and_aov() {
        let orders = vec![order("a", 30_000.0), order("b", 20_000.0), order("c", 10_000.0)];
        let sales = sales(&orders, now());

        assert_eq!(sales.total_revenue, 60_000.0);
        assert_eq!(sales.order_count, 3);
        assert_eq!(sales.average_order_value, 20_000.0);
    }

    #[test]
    fn test_trend_buckets_by_utc_day() {
        let mut early = order("a", 100.0);
        early.created_at = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 1).unwrap();
        let mut late = order("b", 50.0);
        late.created_at = Utc.with_ymd_and_hms(2026, 10, 16, 23, 59, 59).unwrap();
        let mut too_old = order("c", 999.0);
        too_old.created_at = Utc.with_ymd_and_hms(2026, 10, 11, 23, 0, 0).unwrap();

        let sales = sales(&[early, late, too_old], now());
        let dates: Vec<String> = sales.trend.iter().map(|p| p.date.to_string()).collect();

        assert_eq!(dates.first().map(String::as_str), Some("2026-10-12"));
        assert_eq!(dates.last().map(String::as_str), Some("2026-10-18"));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));

        let oct16 = &sales.trend[4];
        assert_eq!(oct16.date.to_string(), "2026-10-16");
        assert_eq!(oct16.revenue, 150.0);
        assert_eq!(oct16.orders, 2);
        // outside the window but still part of the totals
        assert_eq!(sales.total_revenue, 1149.0);
    }

    #[test]
    fn test_revenue_by_status() {
        let mut shipped = order("a", 70.0);
        shipped.status = OrderStatus::Shipped;
        let sales = sales(&[shipped, order("b", 30.0)], now());

        assert_eq!(sales.revenue_by_status[&OrderStatus::Shipped], 70.0);
        assert_eq!(sales.revenue_by_status[&OrderStatus::Pending], 30.0);
        assert_eq!(sales.revenue_by_status[&OrderStatus::Delivered], 0.0);
    }

    // -------------------------------------------------------------------------
    // INVENTORY
    // -------------------------------------------------------------------------
    #[test]
    fn test_valuation_and_margin() {
        let section = inventory(&[item("i1", 10, 100.0, 150.0, 2)], &[], &[]);

        assert_eq!(section.total_valuation_cost, 1000.0);
        assert_eq!(section.total_valuation_retail, 1500.0);
        assert!((section.projected_margin - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_margin_is_zero_without_retail_value() {
        let section = inventory(&[item("i1", 10, 100.0, 0.0, 2)], &[], &[]);
        assert_eq!(section.total_valuation_cost, 1000.0);
        assert_eq!(section.projected_margin, 0.0);
    }

    #[test]
    fn test_stock_level_counts() {
        let items = [
            item("empty", 0, 1.0, 2.0, 3),
            item("low", 3, 1.0, 2.0, 3),
            item("fine", 20, 1.0, 2.0, 3),
        ];
        let section = inventory(&items, &[], &[]);

        assert_eq!(section.low_stock_count, 2);
        assert_eq!(section.out_of_stock_count, 1);
        assert_eq!(section.total_items, 3);
    }

    #[test]
    fn test_shrinkage_uses_cost_price_and_skips_orders() {
        let items = [item("i1", 10, 40.0, 90.0, 2)];
        let logs = [
            log("i1", -2, "Damaged in transit", now()),
            log("i1", -5, "Order #12 placed", now()),
            log("i1", 8, "Restock", now()),
        ];
        let section = inventory(&items, &logs, &[]);
        assert_eq!(section.shrinkage_value, 80.0);
    }

    #[test]
    fn test_shrinkage_counts_reorder_mentions() {
        let items = [item("i1", 10, 10.0, 20.0, 2)];
        let logs = [log("i1", -3, "Damaged, below reorder point", now())];
        let section = inventory(&items, &logs, &[]);
        assert_eq!(section.shrinkage_value, 30.0);
    }

    #[test]
    fn test_shrinkage_resolves_through_product() {
        let items = [item("i1", 10, 25.0, 60.0, 2)];
        let mut linked = product("p1", "Silk Scarf", 4);
        linked.inventory_item_id = Some("i1".to_string());

        let section = inventory(&items, &[log("p1", -3, "Lost", now())], &[linked]);
        assert_eq!(section.shrinkage_value, 75.0);
    }

    #[test]
    fn test_shrinkage_ignores_unknown_references() {
        let items = [item("i1", 10, 25.0, 60.0, 2)];
        let section = inventory(&items, &[log("deleted", -3, "Lost", now())], &[]);
        assert_eq!(section.shrinkage_value, 0.0);
    }

    // -------------------------------------------------------------------------
    // PRODUCTS
    // -------------------------------------------------------------------------
    #[test]
    fn test_top_products_sorted_with_stable_ties() {
        let mut o = order("a", 0.0);
        o.items = vec![
            line("p1", 2, 10.0),
            line("p2", 5, 10.0),
            line("p3", 2, 10.0),
            line("p4", 0, 10.0),
            line("p5", 1, 10.0),
            line("p6", 1, 10.0),
            line("p7", 2, 10.0),
        ];
        let catalog: Vec<Product> = (1..=7)
            .map(|n| product(&format!("p{}", n), &format!("Item {}", n), 10))
            .collect();

        let section = products(&[o], &catalog);
        let ids: Vec<&str> = section.top_products.iter().map(|p| p.product_id.as_str()).collect();

        assert_eq!(ids, vec!["p2", "p1", "p3", "p7", "p5"]);
        assert!(section.top_products.iter().all(|p| p.quantity_sold > 0));
        assert_eq!(section.total_units_sold, 13);
        assert!((section.turnover_rate - 13.0 / 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_deleted_product_is_labelled_unknown() {
        let mut o = order("a", 0.0);
        o.items = vec![line("gone", 3, 200.0)];

        let section = products(&[o], &[]);
        assert_eq!(section.top_products.len(), 1);
        assert_eq!(section.top_products[0].name, UNKNOWN_PRODUCT);
        assert_eq!(section.top_products[0].revenue, 600.0);
        assert_eq!(section.turnover_rate, 0.0);
    }

    #[test]
    fn test_quantities_accumulate_across_orders() {
        let mut a = order("a", 0.0);
        a.items = vec![line("p1", 1, 50.0)];
        let mut b = order("b", 0.0);
        b.items = vec![line("p1", 2, 45.0)];

        let perf = product_performance(&[a, b], &[product("p1", "Linen Shirt", 5)]);
        assert_eq!(perf.len(), 1);
        assert_eq!(perf[0].quantity_sold, 3);
        assert_eq!(perf[0].revenue, 140.0);
        assert_eq!(perf[0].name, "Linen Shirt");
    }

    // -------------------------------------------------------------------------
    // CUSTOMERS
    // -------------------------------------------------------------------------
    #[test]
    fn test_emails_are_case_insensitive() {
        let mut a = order("a", 100.0);
        a.customer_email = Some("X@Y.com".to_string());
        let mut b = order("b", 100.0);
        b.customer_email = Some("x@y.com".to_string());

        let section = customers(&[a, b], &[], 200.0, now());
        assert_eq!(section.unique_customers, 1);
        assert_eq!(section.returning_rate, 100.0);
        assert_eq!(section.customer_lifetime_value, 200.0);
    }

    #[test]
    fn test_registered_and_guest_split() {
        let emails = ["member@shop.com", "guest@mail.com", "MEMBER@shop.com"];
        let orders: Vec<Order> = emails
            .iter()
            .enumerate()
            .map(|(i, email)| {
                let mut o = order(&i.to_string(), 10.0);
                o.customer_email = Some(email.to_string());
                o
            })
            .collect();
        let profiles = [profile("Member@Shop.com", Role::Customer, now())];

        let section = customers(&orders, &profiles, 30.0, now());
        assert_eq!(section.unique_customers, 2);
        assert_eq!(section.registered_customers, 1);
        assert_eq!(section.guest_customers, 1);
        assert_eq!(section.returning_rate, 50.0);
    }

    #[test]
    fn test_new_customers_within_thirty_days() {
        let profiles = [
            profile("a@x.com", Role::Customer, now() - Duration::days(3)),
            profile("b@x.com", Role::Customer, now() - Duration::days(45)),
            profile("c@x.com", Role::Admin, now() - Duration::days(1)),
        ];
        let section = customers(&[], &profiles, 0.0, now());
        assert_eq!(section.new_customers, 1);
    }

    // -------------------------------------------------------------------------
    // MARKETING
    // -------------------------------------------------------------------------
    #[test]
    fn test_discount_impact_uses_reconstructed_gross() {
        let mut o = order("a", 0.0);
        o.subtotal = Some(1000.0);
        o.discount_total = Some(100.0);
        o.shipping = Some(50.0);
        // checkout total: max(0, 1000 - 100) + 50
        o.total = Some(950.0);
        o.coupon_code = Some("WELCOME10".to_string());

        assert_eq!(o.total(), 950.0);
        assert_eq!(o.gross_total(), 1050.0);

        let section = marketing(&[o], &[]);
        assert_eq!(section.coupon_orders, 1);
        assert!((section.discount_impact - 100.0 / 1050.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_coupons_means_no_impact() {
        let section = marketing(&[order("a", 500.0)], &[]);
        assert_eq!(section.coupon_orders, 0);
        assert_eq!(section.discount_impact, 0.0);
        assert!(section.top_coupons.is_empty());
    }

    #[test]
    fn test_top_coupons_from_orders_not_counters() {
        let codes = ["vip", "SALE", "VIP", "sale", "vip", "new"];
        let orders: Vec<Order> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let mut o = order(&i.to_string(), 90.0);
                o.discount_total = Some(10.0);
                o.coupon_code = Some(code.to_string());
                o
            })
            .collect();
        let coupons = [
            Coupon {
                code: "VIP".to_string(),
                discount_percent: Some(10.0),
                is_active: true,
                usage_count: Some(400),
            },
            Coupon {
                code: "OLD".to_string(),
                discount_percent: Some(5.0),
                is_active: false,
                usage_count: None,
            },
        ];

        let section = marketing(&orders, &coupons);
        let top: Vec<(&str, u64)> = section
            .top_coupons
            .iter()
            .map(|c| (c.code.as_str(), c.uses))
            .collect();

        assert_eq!(top, vec![("VIP", 3), ("SALE", 2), ("NEW", 1)]);
        assert_eq!(section.active_coupons, 1);
        assert_eq!(section.total_discount, 60.0);
        assert!((section.discount_impact - 10.0).abs() < 1e-9);
    }

    // -------------------------------------------------------------------------
    // OPERATIONS
    // -------------------------------------------------------------------------
    #[test]
    fn test_fulfillment_and_backlog() {
        let mut shipped = order("a", 1.0);
        shipped.status = OrderStatus::Shipped;
        let mut delivered = order("b", 1.0);
        delivered.status = OrderStatus::Delivered;
        let orders = [shipped, delivered, order("c", 1.0), order("d", 1.0)];

        let logs = [
            log("i1", -1, "Sold", now() - Duration::hours(2)),
            log("i1", -1, "Sold", now() - Duration::hours(30)),
        ];
        let section = operations(&orders, &logs, now());

        assert_eq!(section.fulfillment_rate, 50.0);
        assert_eq!(section.backlog, 2);
        assert_eq!(section.recent_activity, 1);
    }

    // -------------------------------------------------------------------------
    // PROFIT
    // -------------------------------------------------------------------------
    #[test]
    fn test_profit_marks_missing_cost_as_estimate() {
        let mut costed = line("p1", 2, 100.0);
        costed.cost_price = Some(30.0);
        let mut o = order("a", 300.0);
        o.items = vec![costed, line("p2", 1, 100.0)];

        let section = profit(&[o], 300.0);
        assert_eq!(section.total_cogs, 60.0);
        assert_eq!(section.gross_profit, 240.0);
        assert_eq!(section.gross_margin, 80.0);
        assert_eq!(section.profit_per_order, 240.0);
        assert_eq!(section.lines_missing_cost, 1);
        assert!(section.is_estimate);
    }

    // -------------------------------------------------------------------------
    // DETERMINISM & DATA QUALITY
    // -------------------------------------------------------------------------
    #[test]
    fn test_repeated_calls_are_identical() {
        let mut a = order("a", 10.0);
        a.customer_email = Some("a@x.com".to_string());
        a.items = vec![line("p1", 1, 10.0)];
        let snapshot = Snapshot {
            orders: vec![a],
            products: vec![product("p1", "Tote", 3)],
            ..Snapshot::default()
        };

        let first = serde_json::to_string(&compute_analytics(&snapshot, now())).unwrap();
        let second = serde_json::to_string(&compute_analytics(&snapshot, now())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_data_quality_counts_missing_numbers() {
        let mut o = order("a", 10.0);
        o.shipping = None;
        o.items = vec![OrderItem {
            product_id: "p1".to_string(),
            variant_id: None,
            quantity: None,
            price: Some(5.0),
            cost_price: None,
        }];
        let mut i = item("i1", 1, 1.0, 2.0, 1);
        i.reorder_level = None;

        let snapshot = Snapshot {
            orders: vec![o],
            inventory_items: vec![i],
            ..Snapshot::default()
        };

        let quality = DataQuality::scan(&snapshot);
        assert_eq!(quality.missing_numeric_fields, 3);
        assert!(!quality.is_clean());
        assert!(DataQuality::scan(&Snapshot::default()).is_clean());
    }

    #[test]
    fn test_data_quality_ignores_fields_the_report_never_reads() {
        let mut unpriced = product("p1", "Tote", 3);
        unpriced.price = None;
        let snapshot = Snapshot {
            products: vec![unpriced],
            coupons: vec![Coupon {
                code: "VIP".to_string(),
                discount_percent: None,
                is_active: true,
                usage_count: None,
            }],
            ..Snapshot::default()
        };

        assert!(DataQuality::scan(&snapshot).is_clean());
    }
}
