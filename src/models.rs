// =============================================================================
// MODELS MODULE
// =============================================================================
// This module defines the data structures used throughout the service:
// - Storefront records (orders, products, customers, coupons, inventory)
// - The analytics report and its seven sections
// - API request/response bodies
//
// LEARNING NOTES:
// - Numeric fields the storefront database may leave empty are Option<_>.
//   Accessor methods turn a missing value into 0 so a dashboard still renders
//   with partial data (see analytics::DataQuality for how they are counted).
// - Serde handles JSON serialization/deserialization
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// STOREFRONT RECORDS
// =============================================================================

// -----------------------------------------------------------------------------
// ORDER STATUS
// -----------------------------------------------------------------------------
/// Fulfillment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Shipped and delivered orders have left the warehouse
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(anyhow::anyhow!("Unknown order status: {}", other)),
        }
    }
}

// -----------------------------------------------------------------------------
// ORDER LINE ITEM
// -----------------------------------------------------------------------------
/// A single line of an order, with price snapshots taken at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Catalog product this line was sold from
    pub product_id: String,

    /// Optional variant (size, colour, ...)
    #[serde(default)]
    pub variant_id: Option<String>,

    #[serde(default)]
    pub quantity: Option<i64>,

    /// Unit price at time of sale
    #[serde(default)]
    pub price: Option<f64>,

    /// Unit cost at time of sale. Lines written before cost snapshots
    /// existed don't carry one.
    #[serde(default)]
    pub cost_price: Option<f64>,
}

impl OrderItem {
    pub fn quantity(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }

    pub fn price(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }

    pub fn line_revenue(&self) -> f64 {
        self.quantity() as f64 * self.price()
    }

    pub fn line_cost(&self) -> f64 {
        self.quantity() as f64 * self.cost_price.unwrap_or(0.0)
    }
}

// -----------------------------------------------------------------------------
// ORDER
// -----------------------------------------------------------------------------
/// A storefront order
///
/// # Example JSON
/// ```json
/// {
///   "id": "ord_1",
///   "customer_email": "ada@example.com",
///   "items": [{ "product_id": "p1", "quantity": 2, "price": 15000 }],
///   "subtotal": 30000, "shipping": 0, "discount_total": 0, "total": 30000,
///   "status": "pending",
///   "created_at": "2026-10-18T09:30:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,

    #[serde(default)]
    pub customer_email: Option<String>,

    #[serde(default)]
    pub customer_name: Option<String>,

    pub items: Vec<OrderItem>,

    #[serde(default)]
    pub subtotal: Option<f64>,

    #[serde(default)]
    pub shipping: Option<f64>,

    #[serde(default)]
    pub discount_total: Option<f64>,

    #[serde(default)]
    pub coupon_code: Option<String>,

    /// Computed at checkout and trusted thereafter
    #[serde(default)]
    pub total: Option<f64>,

    pub status: OrderStatus,

    #[serde(default)]
    pub payment_method: Option<String>,

    #[serde(default)]
    pub payment_status: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn subtotal(&self) -> f64 {
        self.subtotal.unwrap_or(0.0)
    }

    pub fn shipping(&self) -> f64 {
        self.shipping.unwrap_or(0.0)
    }

    pub fn discount_total(&self) -> f64 {
        self.discount_total.unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.total.unwrap_or(0.0)
    }

    /// Revenue before the coupon was applied
    pub fn gross_total(&self) -> f64 {
        self.total() + self.discount_total()
    }

    /// Coupon code normalized for grouping, if one was applied
    pub fn coupon(&self) -> Option<String> {
        self.coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_uppercase)
    }

    /// Customer email folded for comparison, if present
    pub fn email_key(&self) -> Option<String> {
        self.customer_email.as_deref().and_then(email_key)
    }
}

/// Emails are compared trimmed and lowercased: "A@B.com" and "a@b.com" are
/// the same customer.
pub fn email_key(email: &str) -> Option<String> {
    let key = email.trim().to_lowercase();
    (!key.is_empty()).then_some(key)
}

// -----------------------------------------------------------------------------
// PRODUCT
// -----------------------------------------------------------------------------
/// A size/colour variant of a catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub stock: Option<i64>,

    #[serde(default)]
    pub price: Option<f64>,
}

/// A catalog product as shown on the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub brand: Option<String>,

    /// Retail price
    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default)]
    pub stock: Option<i64>,

    #[serde(default)]
    pub variants: Vec<ProductVariant>,

    /// Inventory item holding this product's cost/margin data
    #[serde(default)]
    pub inventory_item_id: Option<String>,
}

impl Product {
    pub fn stock(&self) -> i64 {
        self.stock.unwrap_or(0)
    }
}

// -----------------------------------------------------------------------------
// INVENTORY ITEM
// -----------------------------------------------------------------------------
/// A stock-keeping record. Source of truth for cost and margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,

    /// Stock Keeping Unit, e.g. "DRS-SILK-M"
    pub sku: String,

    pub name: String,

    #[serde(default)]
    pub cost_price: Option<f64>,

    #[serde(default)]
    pub selling_price: Option<f64>,

    #[serde(default)]
    pub stock: Option<i64>,

    /// Stock level at or below which the item should be reordered
    #[serde(default)]
    pub reorder_level: Option<i64>,

    #[serde(default)]
    pub supplier: Option<String>,
}

impl InventoryItem {
    pub fn stock(&self) -> i64 {
        self.stock.unwrap_or(0)
    }

    pub fn cost_price(&self) -> f64 {
        self.cost_price.unwrap_or(0.0)
    }

    pub fn selling_price(&self) -> f64 {
        self.selling_price.unwrap_or(0.0)
    }

    pub fn reorder_level(&self) -> i64 {
        self.reorder_level.unwrap_or(0)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock() <= self.reorder_level()
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock() == 0
    }
}

// -----------------------------------------------------------------------------
// INVENTORY LOG
// -----------------------------------------------------------------------------
/// Append-only audit entry for a stock adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLog {
    pub id: String,

    /// Inventory item id, or a product id for catalog-level adjustments
    pub item_id: String,

    /// Signed change (negative removes stock)
    #[serde(default)]
    pub change_amount: Option<i64>,

    pub reason: String,

    pub created_at: DateTime<Utc>,
}

impl InventoryLog {
    pub fn change_amount(&self) -> i64 {
        self.change_amount.unwrap_or(0)
    }

    /// Stock that left because an order was placed or fulfilled.
    ///
    /// "order" must appear as a word of its own; "reorder" or "border" don't count.
    pub fn is_order_attributed(&self) -> bool {
        self.reason
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word.eq_ignore_ascii_case("order") || word.eq_ignore_ascii_case("orders"))
    }
}

// -----------------------------------------------------------------------------
// CUSTOMER PROFILE
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            other => Err(anyhow::anyhow!("Unknown role: {}", other)),
        }
    }
}

/// A registered storefront account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: String,
    pub email: String,

    #[serde(default)]
    pub full_name: Option<String>,

    pub role: Role,

    pub created_at: DateTime<Utc>,
}

// -----------------------------------------------------------------------------
// COUPON
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,

    #[serde(default)]
    pub discount_percent: Option<f64>,

    #[serde(default)]
    pub is_active: bool,

    /// Counter maintained by checkout. Analytics derives redemptions from
    /// orders instead.
    #[serde(default)]
    pub usage_count: Option<i64>,
}

// -----------------------------------------------------------------------------
// SNAPSHOT
// -----------------------------------------------------------------------------
/// Everything the analytics fold reads, fetched once per report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub orders: Vec<Order>,
    pub products: Vec<Product>,
    pub customers: Vec<CustomerProfile>,
    pub coupons: Vec<Coupon>,
    pub inventory_logs: Vec<InventoryLog>,
    pub inventory_items: Vec<InventoryItem>,
}

// =============================================================================
// ANALYTICS REPORT
// =============================================================================
// One struct per dashboard tab. Maps are BTreeMaps so the serialized report
// is identical for identical input.

/// The full analytics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub sales: SalesSection,
    pub inventory: InventorySection,
    pub products: ProductsSection,
    pub customers: CustomersSection,
    pub marketing: MarketingSection,
    pub operations: OperationsSection,
    pub profit: ProfitSection,
}

/// One day of the revenue trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// UTC calendar day, serialized as YYYY-MM-DD
    pub date: NaiveDate,
    pub revenue: f64,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSection {
    pub total_revenue: f64,
    pub net_revenue: f64,
    pub shipping_revenue: f64,
    pub order_count: u64,
    pub average_order_value: f64,
    pub revenue_by_status: BTreeMap<OrderStatus, f64>,
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySection {
    pub total_valuation_cost: f64,
    pub total_valuation_retail: f64,
    /// Percent of retail valuation that is margin
    pub projected_margin: f64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    /// Cost of stock removed for reasons other than orders
    pub shrinkage_value: f64,
    pub total_items: u64,
}

/// Sales of one catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformance {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsSection {
    pub top_products: Vec<ProductPerformance>,
    pub total_units_sold: i64,
    pub turnover_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomersSection {
    pub unique_customers: u64,
    pub new_customers: u64,
    pub returning_rate: f64,
    pub customer_lifetime_value: f64,
    pub registered_customers: u64,
    pub guest_customers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponUsage {
    pub code: String,
    pub uses: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingSection {
    pub coupon_orders: u64,
    pub top_coupons: Vec<CouponUsage>,
    pub total_discount: f64,
    /// Percent of gross revenue given away as discounts
    pub discount_impact: f64,
    pub active_coupons: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsSection {
    pub fulfillment_rate: f64,
    pub backlog: u64,
    /// Inventory log entries in the trailing 24 hours
    pub recent_activity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitSection {
    pub total_cogs: f64,
    pub gross_profit: f64,
    pub gross_margin: f64,
    pub profit_per_order: f64,
    /// Order lines sold without a cost snapshot (counted as zero cost)
    pub lines_missing_cost: u64,
    /// True when COGS is a lower bound because some lines lack cost
    pub is_estimate: bool,
}

// =============================================================================
// API REQUEST/RESPONSE STRUCTURES
// =============================================================================

// -----------------------------------------------------------------------------
// COMPUTE REQUEST
// -----------------------------------------------------------------------------
/// Request body for computing a report from caller-supplied records
///
/// All six arrays are required (they may be empty). `now` pins the instant
/// the trailing windows are measured from; the server clock is used when
/// it is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeRequest {
    #[serde(flatten)]
    pub snapshot: Snapshot,

    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

// -----------------------------------------------------------------------------
// STOCK ADJUSTMENT REQUEST
// -----------------------------------------------------------------------------
/// Request body for manual stock adjustments
///
/// # Example JSON
/// ```json
/// { "item_id": "inv_1", "delta": -2, "reason": "Damaged in studio shoot" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    pub item_id: String,

    /// Amount to adjust (positive to add, negative to remove)
    pub delta: i64,

    /// Reason for adjustment (for audit trail)
    pub reason: String,
}

// -----------------------------------------------------------------------------
// LOW STOCK ALERT
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub stock: i64,
    pub reorder_level: i64,
    pub supplier: Option<String>,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Detailed readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

/// Individual dependency health checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: bool,
    /// None when the report cache is not configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<bool>,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}
