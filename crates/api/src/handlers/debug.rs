//! Process variables for operators.

use axum::extract::State;
use axum::Json;
use jobstatus_events::PublisherStats;
use serde::Serialize;

use crate::state::AppState;

/// Payload of `GET /debug/vars`.
#[derive(Debug, Serialize)]
pub struct DebugVars {
    /// Command line the process was started with.
    pub cmdline: Vec<String>,
    pub uptime_secs: u64,
    pub exchange: String,
    pub routing_key: String,
    pub publisher: PublisherStats,
}

/// GET /debug/vars
pub async fn debug_vars(State(state): State<AppState>) -> Json<DebugVars> {
    Json(DebugVars {
        cmdline: std::env::args().collect(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        exchange: state.config.amqp.exchange.clone(),
        routing_key: state.config.amqp.routing_key.clone(),
        publisher: state.publisher.stats(),
    })
}
