//! Handlers for job status reports.
//!
//! Both forms decode and validate the report before the publisher is
//! touched, then run the publisher's bounded retry. The published update is
//! echoed back on success. A terminal publish failure is reported to the
//! agent and the service keeps serving.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use jobstatus_core::UpdateMessage;

use crate::error::AppResult;
use crate::request::{decode_batch, decode_single, StatusUpdateRequest};
use crate::state::AppState;

/// POST /{uuid}/status
pub async fn post_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> AppResult<Json<UpdateMessage>> {
    let request = decode_single(&job_id, &body)?;
    publish(&state, request).await
}

/// POST /status/batch
pub async fn post_batch_status(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<UpdateMessage>> {
    let request = decode_batch(&body)?;
    publish(&state, request).await
}

async fn publish(state: &AppState, request: StatusUpdateRequest) -> AppResult<Json<UpdateMessage>> {
    let update = state
        .publisher
        .update(
            request.state,
            &request.job_id,
            &request.hostname,
            &request.message,
        )
        .await?;

    Ok(Json(update))
}
