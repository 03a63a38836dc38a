// =============================================================================
// DATABASE MODULE
// =============================================================================
// This module handles all PostgreSQL database operations.
//
// The storefront writes orders, products, profiles and coupons; this service
// reads them as one snapshot for analytics and owns the inventory tables
// (items and their audit log).
//
// LEARNING NOTES:
// - Connection pooling lets concurrent requests share a few connections
// - Transactions keep a stock change and its audit entry together
// - JSONB columns decode straight into Rust structs with sqlx::types::Json
// =============================================================================

use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    PgPool, Row,
};
use uuid::Uuid;

use crate::models::{
    AdjustStockRequest, Coupon, CustomerProfile, InventoryItem, InventoryLog, LowStockAlert,
    Order, OrderItem, Product, ProductVariant, Snapshot,
};

// -----------------------------------------------------------------------------
// DATABASE WRAPPER
// -----------------------------------------------------------------------------
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

const INVENTORY_ITEM_COLUMNS: &str =
    "id, sku, name, cost_price, selling_price, stock, reorder_level, supplier";

/// Result of applying a requested stock change with the zero floor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub new_stock: i64,

    /// Signed change actually made, which is what the audit log records
    pub applied: i64,
}

impl StockAdjustment {
    pub fn apply(current: i64, delta: i64) -> Self {
        let new_stock = current.saturating_add(delta).max(0);
        Self {
            new_stock,
            applied: new_stock - current,
        }
    }
}

impl Database {
    // -------------------------------------------------------------------------
    // CONNECTION
    // -------------------------------------------------------------------------
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .idle_timeout(std::time::Duration::from_secs(300))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Create a pool that only connects on first use
    #[cfg(test)]
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy(database_url)
            .context("Invalid DATABASE_URL")?;

        Ok(Self { pool })
    }

    // -------------------------------------------------------------------------
    // MIGRATIONS
    // -------------------------------------------------------------------------
    /// Create the storefront tables if they don't exist
    pub async fn run_migrations(&self) -> Result<()> {
        let statements = [
            (
                "orders",
                r#"
                CREATE TABLE IF NOT EXISTS orders (
                    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::text,
                    customer_email TEXT,
                    customer_name TEXT,
                    -- [{product_id, variant_id, quantity, price, cost_price}]
                    items JSONB NOT NULL DEFAULT '[]',
                    subtotal DOUBLE PRECISION,
                    shipping DOUBLE PRECISION,
                    discount_total DOUBLE PRECISION,
                    coupon_code TEXT,
                    total DOUBLE PRECISION,
                    status TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'shipped', 'delivered')),
                    payment_method TEXT,
                    payment_status TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "products",
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::text,
                    name TEXT NOT NULL,
                    category TEXT,
                    brand TEXT,
                    price DOUBLE PRECISION,
                    stock BIGINT,
                    variants JSONB NOT NULL DEFAULT '[]',
                    inventory_item_id TEXT
                )
                "#,
            ),
            (
                "profiles",
                r#"
                CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::text,
                    email TEXT NOT NULL,
                    full_name TEXT,
                    role TEXT NOT NULL DEFAULT 'customer'
                        CHECK (role IN ('admin', 'customer')),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "coupons",
                r#"
                CREATE TABLE IF NOT EXISTS coupons (
                    code TEXT PRIMARY KEY,
                    discount_percent DOUBLE PRECISION,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    usage_count BIGINT
                )
                "#,
            ),
            (
                "inventory_items",
                r#"
                CREATE TABLE IF NOT EXISTS inventory_items (
                    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::text,
                    sku VARCHAR(64) UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    cost_price DOUBLE PRECISION,
                    selling_price DOUBLE PRECISION,
                    stock BIGINT NOT NULL DEFAULT 0,
                    reorder_level BIGINT NOT NULL DEFAULT 5,
                    supplier TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    CONSTRAINT non_negative_stock CHECK (stock >= 0)
                )
                "#,
            ),
            (
                "inventory_logs",
                r#"
                CREATE TABLE IF NOT EXISTS inventory_logs (
                    id TEXT PRIMARY KEY,
                    item_id TEXT NOT NULL,
                    change_amount BIGINT NOT NULL,
                    reason TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "inventory_logs index",
                "CREATE INDEX IF NOT EXISTS idx_inventory_logs_created_at ON inventory_logs(created_at)",
            ),
            (
                "orders index",
                "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at)",
            ),
        ];

        for (name, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to create {}", name))?;
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // SNAPSHOT
    // -------------------------------------------------------------------------
    /// Read every table the analytics report needs.
    ///
    /// The six reads run concurrently on the pool.
    pub async fn load_snapshot(&self) -> Result<Snapshot> {
        let (orders, products, customers, coupons, inventory_logs, inventory_items) = tokio::try_join!(
            self.fetch(
                "orders",
                "SELECT * FROM orders ORDER BY created_at ASC, id ASC",
                order_from_row,
            ),
            self.fetch(
                "products",
                "SELECT * FROM products ORDER BY id ASC",
                product_from_row,
            ),
            self.fetch(
                "profiles",
                "SELECT * FROM profiles ORDER BY created_at ASC, id ASC",
                profile_from_row,
            ),
            self.fetch(
                "coupons",
                "SELECT * FROM coupons ORDER BY code ASC",
                coupon_from_row,
            ),
            self.fetch(
                "inventory_logs",
                "SELECT * FROM inventory_logs ORDER BY created_at ASC, id ASC",
                log_from_row,
            ),
            self.fetch(
                "inventory_items",
                "SELECT * FROM inventory_items ORDER BY sku ASC",
                inventory_item_from_row,
            ),
        )?;

        Ok(Snapshot {
            orders,
            products,
            customers,
            coupons,
            inventory_logs,
            inventory_items,
        })
    }

    async fn fetch<T>(
        &self,
        table: &str,
        sql: &str,
        map: fn(&PgRow) -> Result<T>,
    ) -> Result<Vec<T>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {}", table))?;

        rows.iter()
            .map(map)
            .collect::<Result<Vec<T>>>()
            .with_context(|| format!("Failed to decode {}", table))
    }

    // -------------------------------------------------------------------------
    // INVENTORY
    // -------------------------------------------------------------------------

    /// Items at or below their reorder level, lowest stock first
    pub async fn get_low_stock_items(&self) -> Result<Vec<LowStockAlert>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sku, name, stock, reorder_level, supplier
            FROM inventory_items
            WHERE stock <= reorder_level
            ORDER BY stock ASC, sku ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch low stock items")?;

        rows.iter()
            .map(|row| -> Result<LowStockAlert> {
                Ok(LowStockAlert {
                    item_id: row.try_get("id")?,
                    sku: row.try_get("sku")?,
                    name: row.try_get("name")?,
                    stock: row.try_get("stock")?,
                    reorder_level: row.try_get("reorder_level")?,
                    supplier: row.try_get("supplier")?,
                })
            })
            .collect()
    }

    /// Adjust stock and append the matching audit log entry.
    ///
    /// Stock never drops below zero, and the log records the change that was
    /// actually applied. A request that changes nothing (removing from an
    /// empty item) writes no log entry. Returns `None` if the item doesn't
    /// exist.
    pub async fn adjust_stock(&self, req: &AdjustStockRequest) -> Result<Option<InventoryItem>> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so the applied change is computed from the stock we update
        let current: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM inventory_items WHERE id = $1 FOR UPDATE")
                .bind(&req.item_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to read stock")?;

        let Some(current) = current else {
            return Ok(None);
        };
        let adjustment = StockAdjustment::apply(current, req.delta);

        let row = sqlx::query(&format!(
            r#"
            UPDATE inventory_items
            SET stock = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            INVENTORY_ITEM_COLUMNS
        ))
        .bind(adjustment.new_stock)
        .bind(&req.item_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update stock")?;
        let item = inventory_item_from_row(&row)?;

        if adjustment.applied != 0 {
            sqlx::query(
                r#"
                INSERT INTO inventory_logs (id, item_id, change_amount, reason)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&req.item_id)
            .bind(adjustment.applied)
            .bind(&req.reason)
            .execute(&mut *tx)
            .await
            .context("Failed to write inventory log")?;
        } else {
            tracing::debug!(item_id = %req.item_id, delta = req.delta, "Stock unchanged, no log written");
        }

        tx.commit().await?;

        Ok(Some(item))
    }

    // -------------------------------------------------------------------------
    // HEALTH CHECK
    // -------------------------------------------------------------------------

    /// Check if database connection is healthy
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

// =============================================================================
// ROW MAPPING
// =============================================================================

fn order_from_row(row: &PgRow) -> Result<Order> {
    let items: Json<Vec<OrderItem>> = row.try_get("items")?;
    let status: String = row.try_get("status")?;

    Ok(Order {
        id: row.try_get("id")?,
        customer_email: row.try_get("customer_email")?,
        customer_name: row.try_get("customer_name")?,
        items: items.0,
        subtotal: row.try_get("subtotal")?,
        shipping: row.try_get("shipping")?,
        discount_total: row.try_get("discount_total")?,
        coupon_code: row.try_get("coupon_code")?,
        total: row.try_get("total")?,
        status: status.parse()?,
        payment_method: row.try_get("payment_method")?,
        payment_status: row.try_get("payment_status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    let variants: Json<Vec<ProductVariant>> = row.try_get("variants")?;

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        brand: row.try_get("brand")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        variants: variants.0,
        inventory_item_id: row.try_get("inventory_item_id")?,
    })
}

fn profile_from_row(row: &PgRow) -> Result<CustomerProfile> {
    let role: String = row.try_get("role")?;

    Ok(CustomerProfile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role: role.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

fn coupon_from_row(row: &PgRow) -> Result<Coupon> {
    Ok(Coupon {
        code: row.try_get("code")?,
        discount_percent: row.try_get("discount_percent")?,
        is_active: row.try_get("is_active")?,
        usage_count: row.try_get("usage_count")?,
    })
}

fn log_from_row(row: &PgRow) -> Result<InventoryLog> {
    Ok(InventoryLog {
        id: row.try_get("id")?,
        item_id: row.try_get("item_id")?,
        change_amount: row.try_get("change_amount")?,
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
    })
}

fn inventory_item_from_row(row: &PgRow) -> Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.try_get("id")?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        cost_price: row.try_get("cost_price")?,
        selling_price: row.try_get("selling_price")?,
        stock: row.try_get("stock")?,
        reorder_level: row.try_get("reorder_level")?,
        supplier: row.try_get("supplier")?,
    })
}
