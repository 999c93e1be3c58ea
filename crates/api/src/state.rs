use std::sync::Arc;
use std::time::Instant;

use jobstatus_events::JobUpdatePublisher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is `Copy`).
#[derive(Clone)]
pub struct AppState {
    /// The one publisher shared by every request.
    pub publisher: Arc<JobUpdatePublisher>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the process started serving (for `/debug/vars`).
    pub started_at: Instant,
}

impl AppState {
    pub fn new(publisher: Arc<JobUpdatePublisher>, config: Arc<ServerConfig>) -> Self {
        Self {
            publisher,
            config,
            started_at: Instant::now(),
        }
    }
}
