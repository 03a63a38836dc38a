// =============================================================================
// METRICS MODULE
// =============================================================================
// This module sets up Prometheus metrics for observability.
//
// LEARNING NOTES:
// - Prometheus uses a "pull" model - it scrapes /metrics endpoint
// - Counter: only goes up. Gauge: up or down. Histogram: distribution.
// - Labels add dimensions to metrics (e.g., endpoint="/api/v1/analytics/report")
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::models::AnalyticsReport;

// =============================================================================
// METRIC NAMES (Constants)
// =============================================================================

/// HTTP request counter
/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// HTTP request duration histogram
/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Time spent folding a snapshot into a report
/// Labels: source (request/database)
pub const ANALYTICS_COMPUTE_DURATION_SECONDS: &str = "analytics_compute_duration_seconds";

/// Numeric fields that were missing and read as zero
/// Labels: source
pub const ANALYTICS_DATA_QUALITY_SUBSTITUTIONS_TOTAL: &str =
    "analytics_data_quality_substitutions_total";

/// Report cache lookups
/// Labels: result (hit/miss/error)
pub const ANALYTICS_CACHE_LOOKUPS_TOTAL: &str = "analytics_cache_lookups_total";

/// Total revenue of the last database-backed report
pub const STOREFRONT_REVENUE_TOTAL: &str = "storefront_revenue_total";

/// Inventory stock level gauge
/// Labels: sku
pub const INVENTORY_STOCK_LEVEL: &str = "inventory_stock_level";

/// Low stock items gauge (current count of items at or below reorder level)
pub const INVENTORY_LOW_STOCK_ITEMS: &str = "inventory_low_stock_items";

/// Database query duration histogram
/// Labels: operation
pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";

/// Redis operation duration histogram
/// Labels: operation
pub const REDIS_OPERATION_DURATION_SECONDS: &str = "redis_operation_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Initialize the Prometheus recorder and install it globally
pub fn setup_metrics() -> Result<PrometheusHandle> {
    let handle = builder()?.install_recorder()?;
    describe_metrics();
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
/// Lets tests build an AppState without touching process-wide state.
#[cfg(test)]
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn builder() -> Result<PrometheusBuilder> {
    let mut builder = PrometheusBuilder::new();
    for metric in [
        HTTP_REQUEST_DURATION_SECONDS,
        ANALYTICS_COMPUTE_DURATION_SECONDS,
        DB_QUERY_DURATION_SECONDS,
        REDIS_OPERATION_DURATION_SECONDS,
    ] {
        builder = builder.set_buckets_for_metric(Matcher::Full(metric.to_string()), LATENCY_BUCKETS)?;
    }
    Ok(builder)
}

fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_histogram!(
        ANALYTICS_COMPUTE_DURATION_SECONDS,
        "Time spent computing an analytics report in seconds"
    );
    describe_counter!(
        ANALYTICS_DATA_QUALITY_SUBSTITUTIONS_TOTAL,
        "Missing numeric fields substituted with zero"
    );
    describe_counter!(ANALYTICS_CACHE_LOOKUPS_TOTAL, "Report cache lookups by result");
    describe_gauge!(STOREFRONT_REVENUE_TOTAL, "Total revenue in the latest stored report");
    describe_gauge!(INVENTORY_STOCK_LEVEL, "Current stock level for each SKU");
    describe_gauge!(
        INVENTORY_LOW_STOCK_ITEMS,
        "Number of items at or below their reorder level"
    );
    describe_histogram!(DB_QUERY_DURATION_SECONDS, "Database query latency in seconds");
    describe_histogram!(REDIS_OPERATION_DURATION_SECONDS, "Redis operation latency in seconds");
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Record an HTTP request
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Record one report computation and its data-quality substitutions
pub fn record_compute(source: &str, duration_secs: f64, substitutions: u64) {
    histogram!(ANALYTICS_COMPUTE_DURATION_SECONDS, "source" => source.to_string())
        .record(duration_secs);

    if substitutions > 0 {
        counter!(
            ANALYTICS_DATA_QUALITY_SUBSTITUTIONS_TOTAL,
            "source" => source.to_string()
        )
        .increment(substitutions);
    }
}

/// Publish headline figures of a report computed from the database
pub fn set_report_gauges(report: &AnalyticsReport) {
    gauge!(STOREFRONT_REVENUE_TOTAL).set(report.sales.total_revenue);
    gauge!(INVENTORY_LOW_STOCK_ITEMS).set(report.inventory.low_stock_count as f64);
}

/// Record a cache lookup outcome: "hit", "miss" or "error"
pub fn record_cache_lookup(result: &'static str) {
    counter!(ANALYTICS_CACHE_LOOKUPS_TOTAL, "result" => result).increment(1);
}

/// Update stock level gauge for a SKU
pub fn set_stock_level(sku: &str, level: i64) {
    gauge!(INVENTORY_STOCK_LEVEL, "sku" => sku.to_string()).set(level as f64);
}

/// Update low stock items count
pub fn set_low_stock_count(count: usize) {
    gauge!(INVENTORY_LOW_STOCK_ITEMS).set(count as f64);
}

/// Record database query duration
pub fn record_db_query(operation: &str, duration_secs: f64) {
    histogram!(DB_QUERY_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration_secs);
}

/// Record Redis operation duration
pub fn record_redis_operation(operation: &str, duration_secs: f64) {
    histogram!(REDIS_OPERATION_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration_secs);
}
