use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the publisher currently holds a broker channel. Read without
    /// waiting for an update in progress.
    pub broker_connected: bool,
}

/// GET /health -- returns service and broker connection health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let broker_connected = state.publisher.is_connected();

    let status = if broker_connected { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        broker_connected,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
