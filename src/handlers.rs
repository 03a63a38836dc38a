// =============================================================================
// HANDLERS MODULE
// =============================================================================
// This module contains all HTTP request handlers (controller layer).
//
// AXUM EXTRACTORS USED HERE:
// - State<T>: Access shared application state
// - Result<Query<T>, QueryRejection>: Extract query parameters (?now=... → now)
// - Result<Json<T>, JsonRejection>: Parse a JSON body
// - MatchedPath: The route pattern that matched, used as the metrics label
//
// Rejections are kept rather than left to axum so bad input gets our JSON
// error body.
// =============================================================================

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        MatchedPath, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use crate::analytics::{compute_analytics, DataQuality};
use crate::cache;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::*;
use crate::AppState;

/// Response header carrying the number of missing numeric fields read as 0
pub const DATA_QUALITY_HEADER: &str = "x-data-quality-substitutions";

/// A report plus its data-quality header
type ReportResponse = ([(&'static str, String); 1], Json<AnalyticsReport>);

fn report_response(report: AnalyticsReport, quality: DataQuality) -> ReportResponse {
    (
        [(DATA_QUALITY_HEADER, quality.missing_numeric_fields.to_string())],
        Json(report),
    )
}

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness probe - Is the service running?
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe - Is the service ready to handle requests?
///
/// Checks the database and, when configured, the report cache.
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let db_healthy = state.db.health_check().await;

    let redis_healthy = match &state.cache {
        Some(cache) => Some(cache.ping().await),
        None => None,
    };

    let all_healthy = db_healthy && redis_healthy.unwrap_or(true);
    let (code, status) = if all_healthy {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            checks: ReadinessChecks {
                database: db_healthy,
                redis: redis_healthy,
            },
        }),
    )
}

// =============================================================================
// METRICS ENDPOINT
// =============================================================================
/// Prometheus metrics endpoint
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

// =============================================================================
// ANALYTICS ENDPOINTS
// =============================================================================

// -----------------------------------------------------------------------------
// COMPUTE FROM REQUEST BODY
// -----------------------------------------------------------------------------
/// Compute a report from records supplied by the caller
///
/// POST /analytics/compute
/// POST /api/v1/analytics/compute
///
/// # Request Body
/// ```json
/// {
///   "orders": [...], "products": [...], "customers": [...],
///   "coupons": [...], "inventory_logs": [...], "inventory_items": [...],
///   "now": "2026-10-18T12:00:00Z"
/// }
/// ```
///
/// # Response
/// - 200 OK: the report (all zeros when every array is empty)
/// - 400 Bad Request: an array is missing or a record is malformed
pub async fn compute_report(
    path: MatchedPath,
    payload: Result<Json<ComputeRequest>, JsonRejection>,
) -> AppResult<ReportResponse> {
    let start = Instant::now();
    let endpoint = path.as_str();

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            metrics::record_http_request(
                "POST",
                endpoint,
                400,
                start.elapsed().as_secs_f64(),
            );
            return Err(rejection.into());
        }
    };

    // Pin "now" once so every trailing window agrees
    let now = request.now.unwrap_or_else(Utc::now);
    let snapshot = &request.snapshot;

    let quality = DataQuality::scan(snapshot);
    let report = compute_analytics(snapshot, now);

    let duration = start.elapsed().as_secs_f64();
    metrics::record_compute("request", duration, quality.missing_numeric_fields);
    metrics::record_http_request("POST", endpoint, 200, duration);

    if !quality.is_clean() {
        tracing::warn!(
            missing_numeric_fields = quality.missing_numeric_fields,
            "Report computed from records with missing numbers"
        );
    }

    tracing::info!(
        orders = snapshot.orders.len(),
        products = snapshot.products.len(),
        inventory_items = snapshot.inventory_items.len(),
        now = %now,
        "Computed analytics report from request"
    );

    Ok(report_response(report, quality))
}

// -----------------------------------------------------------------------------
// COMPUTE FROM DATABASE
// -----------------------------------------------------------------------------
/// Query parameters for the stored report
///
/// # Example
/// GET /api/v1/analytics/report?now=2026-10-18T12:00:00Z
#[derive(Debug, Deserialize)]
pub struct ReportParams {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

/// Start of the current minute. Reports requested within the same minute
/// share a cache entry.
fn pinned_minute(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::minutes(1)).unwrap_or(now)
}

/// Compute a report from the storefront database
///
/// GET /api/v1/analytics/report
///
/// # Response
/// - 200 OK: the report
/// - 400 Bad Request: `now` is not an RFC 3339 timestamp
pub async fn stored_report(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> AppResult<ReportResponse> {
    let start = Instant::now();
    let Query(params) = params.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let now = params.now.unwrap_or_else(|| pinned_minute(Utc::now()));

    let snapshot = state.db.load_snapshot().await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());

    let quality = DataQuality::scan(&snapshot);

    // Cache failures degrade to computing the report directly
    let fingerprint = match &state.cache {
        Some(_) => Some(cache::fingerprint(&snapshot, now)?),
        None => None,
    };

    if let (Some(report_cache), Some(fingerprint)) = (&state.cache, &fingerprint) {
        match report_cache.get(fingerprint).await {
            Ok(Some(report)) => {
                metrics::record_cache_lookup("hit");
                metrics::record_http_request(
                    "GET",
                    "/api/v1/analytics/report",
                    200,
                    start.elapsed().as_secs_f64(),
                );
                tracing::debug!(%fingerprint, "Serving cached analytics report");
                return Ok(report_response(report, quality));
            }
            Ok(None) => metrics::record_cache_lookup("miss"),
            Err(e) => {
                metrics::record_cache_lookup("error");
                tracing::warn!(error = %e, "Report cache lookup failed");
            }
        }
    }

    let compute_start = Instant::now();
    let report = compute_analytics(&snapshot, now);
    metrics::record_compute(
        "database",
        compute_start.elapsed().as_secs_f64(),
        quality.missing_numeric_fields,
    );
    metrics::set_report_gauges(&report);

    if let (Some(report_cache), Some(fingerprint)) = (&state.cache, &fingerprint) {
        if let Err(e) = report_cache.put(fingerprint, &report).await {
            tracing::warn!(error = %e, "Failed to cache analytics report");
        }
    }

    if !quality.is_clean() {
        tracing::warn!(
            missing_numeric_fields = quality.missing_numeric_fields,
            "Stored records have missing numbers"
        );
    }

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/analytics/report", 200, duration);

    tracing::info!(
        orders = snapshot.orders.len(),
        now = %now,
        total_revenue = report.sales.total_revenue,
        "Computed analytics report from database"
    );

    Ok(report_response(report, quality))
}

// =============================================================================
// INVENTORY ENDPOINTS
// =============================================================================

// -----------------------------------------------------------------------------
// ADJUST STOCK
// -----------------------------------------------------------------------------
/// Manually adjust stock and record the change in the inventory log
///
/// POST /api/v1/inventory/adjust
///
/// # Request Body
/// ```json
/// { "item_id": "inv_1", "delta": 12, "reason": "Received shipment" }
/// ```
///
/// # Response
/// - 200 OK: the updated item
/// - 400 Bad Request: zero delta or empty reason
/// - 404 Not Found: no such inventory item
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AdjustStockRequest>, JsonRejection>,
) -> AppResult<Json<InventoryItem>> {
    let start = Instant::now();
    let Json(request) = payload?;

    if request.delta == 0 {
        return Err(AppError::BadRequest("delta must not be zero".to_string()));
    }
    if request.reason.trim().is_empty() {
        return Err(AppError::BadRequest(
            "reason is required for the audit log".to_string(),
        ));
    }

    tracing::info!(
        item_id = %request.item_id,
        delta = request.delta,
        reason = %request.reason,
        "Adjusting stock"
    );

    let item = state
        .db
        .adjust_stock(&request)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inventory item not found: {}", request.item_id)))?;

    metrics::set_stock_level(&item.sku, item.stock());

    let duration = start.elapsed().as_secs_f64();
    metrics::record_db_query("update", duration);
    metrics::record_http_request("POST", "/api/v1/inventory/adjust", 200, duration);

    Ok(Json(item))
}

// -----------------------------------------------------------------------------
// LOW STOCK ALERTS
// -----------------------------------------------------------------------------
/// Get all items at or below their reorder level
///
/// GET /api/v1/inventory/alerts
pub async fn low_stock_alerts(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<LowStockAlert>>> {
    let start = Instant::now();

    let alerts = state.db.get_low_stock_items().await?;

    metrics::set_low_stock_count(alerts.len());
    for alert in &alerts {
        metrics::set_stock_level(&alert.sku, alert.stock);
    }

    let duration = start.elapsed().as_secs_f64();
    metrics::record_db_query("select", duration);
    metrics::record_http_request("GET", "/api/v1/inventory/alerts", 200, duration);

    Ok(Json(alerts))
}
