pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the status-report route tree.
///
/// ```text
/// /{uuid}/status        single update (POST), uuid = lowercase-hex 8-4-4-4-12
/// /status/batch         update with the job ID in the body (POST)
/// /debug/vars           process variables (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/{uuid}/status", post(handlers::status::post_status))
        .route("/status/batch", post(handlers::status::post_batch_status))
        .route("/debug/vars", get(handlers::debug::debug_vars))
}
