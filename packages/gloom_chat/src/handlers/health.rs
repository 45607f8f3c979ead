use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::metrics;
use crate::server::AppState;

/// Health check endpoint - returns relay status
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let uptime_secs = state.metrics.uptime_secs();

    match state.hub.stats().await {
        Ok(stats) => Json(metrics::HealthStatus {
            status: "healthy".to_string(),
            active_users: stats.active_users,
            connections: stats.connections,
            history_length: stats.history_len,
            uptime_secs,
        })
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unavailable",
                "error": e.to_string(),
                "uptimeSecs": uptime_secs,
            })),
        )
            .into_response(),
    }
}

/// Metrics endpoint - returns detailed server metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Liveness probe - returns 200 if the server is running
pub async fn health_live_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}
