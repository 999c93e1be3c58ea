use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobstatus_core::CoreError;
use jobstatus_events::PublisherError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] so every failure renders as
/// `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A validation error from `jobstatus_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The update could not be delivered to the exchange.
    #[error(transparent)]
    Publish(#[from] PublisherError),

    /// The request body is malformed or missing required fields.
    #[error("{0}")]
    Decode(String),

    /// No route matches the request path.
    #[error("{0}")]
    NotFound(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status reported for this error.
    ///
    /// Broker failures are reported as `400` like every other failure; the
    /// reporting agent treats any non-200 answer as "retry later".
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(CoreError::InvalidJobId(_)) => StatusCode::NOT_FOUND,
            AppError::Core(CoreError::UnknownState(_)) => StatusCode::BAD_REQUEST,
            AppError::Decode(_) => StatusCode::BAD_REQUEST,
            AppError::Publish(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match &self {
            AppError::Publish(_) => {
                tracing::error!(error = %message, "Failed to record job status update");
            }
            AppError::NotFound(_) => tracing::debug!(error = %message, "No matching route"),
            _ => tracing::warn!(error = %message, "Rejected job status update"),
        }

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
