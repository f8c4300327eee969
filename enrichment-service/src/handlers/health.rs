use crate::services::get_metrics;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

/// Liveness probe. The service holds no connections of its own, so being able
/// to answer is the whole check.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "enrichment-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Metrics endpoint for Prometheus scraping.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
