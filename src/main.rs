// =============================================================================
// STOREFRONT ANALYTICS SERVICE - Main Entry Point
// =============================================================================
// Back-office service for the boutique storefront.
//
// WHAT THIS SERVICE DOES:
// - Folds orders, catalog, customers, coupons and inventory into the
//   analytics dashboard report (sales, inventory, products, customers,
//   marketing, operations, profit)
// - Computes reports from caller-supplied records or from the storefront
//   database, caching the latter in Redis when configured
// - Adjusts stock with an audit trail and lists low-stock items
// - Exposes Prometheus metrics for observability
// =============================================================================

// -----------------------------------------------------------------------------
// MODULE DECLARATIONS
// -----------------------------------------------------------------------------
mod analytics; // Report aggregation (analytics.rs)
mod cache; // Redis report cache (cache.rs)
mod config; // Configuration loading (config.rs)
mod db; // Database operations (db.rs)
mod error; // Error types (error.rs)
mod handlers; // HTTP request handlers (handlers.rs)
mod metrics; // Prometheus metrics setup (metrics.rs)
mod models; // Data structures (models.rs)

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::ReportCache;
use crate::config::Config;
use crate::db::Database;
use crate::metrics::setup_metrics;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by all request handlers through Arc<AppState>. Everything in here is
// either a pool/handle that is safe to clone or read-only.
#[derive(Clone)]
pub struct AppState {
    /// Storefront database connection pool
    pub db: Database,

    /// Report cache, when REDIS_URL is set
    pub cache: Option<ReportCache>,

    /// Used to render metrics in Prometheus format
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

// -----------------------------------------------------------------------------
// ROUTES
// -----------------------------------------------------------------------------
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ----- Health & Readiness Endpoints -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        // ----- Metrics Endpoint -----
        .route("/metrics", get(handlers::metrics_handler))
        // ----- Analytics API Endpoints -----
        .route("/analytics/compute", post(handlers::compute_report))
        .route("/api/v1/analytics/compute", post(handlers::compute_report))
        .route("/api/v1/analytics/report", get(handlers::stored_report))
        // ----- Inventory API Endpoints -----
        .route("/api/v1/inventory/adjust", post(handlers::adjust_stock))
        .route("/api/v1/inventory/alerts", get(handlers::low_stock_alerts))
        // ----- Middleware Layers -----
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// -----------------------------------------------------------------------------
// MAIN FUNCTION
// -----------------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok();

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG controls log levels, e.g. RUST_LOG=info,storefront_analytics=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_analytics=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Storefront Analytics Service...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        cache_enabled = config.redis_url.is_some(),
        "Configuration loaded"
    );

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Connect to PostgreSQL database
    // -------------------------------------------------------------------------
    let db = Database::connect(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    db.run_migrations().await?;
    info!("Database migrations completed");

    // -------------------------------------------------------------------------
    // STEP 6: Connect to Redis (optional)
    // -------------------------------------------------------------------------
    let cache = match &config.redis_url {
        Some(url) => {
            let cache = ReportCache::connect(url, config.report_cache_ttl_secs).await?;
            info!(ttl_secs = config.report_cache_ttl_secs, "Connected to Redis");
            Some(cache)
        }
        None => {
            warn!("REDIS_URL not set, report caching disabled");
            None
        }
    };

    // -------------------------------------------------------------------------
    // STEP 7: Create application state and routes
    // -------------------------------------------------------------------------
    let state = Arc::new(AppState {
        db,
        cache,
        metrics_handle,
    });
    let app = build_router(state);

    // -------------------------------------------------------------------------
    // STEP 8: Start the HTTP server
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Storefront Analytics Service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
