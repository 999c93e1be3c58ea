//! Decoding of inbound status reports.
//!
//! Two request shapes are accepted and both decode to a
//! [`StatusUpdateRequest`]:
//!
//! - single update: job ID from the URL path, body `{Hostname, Message, State}`;
//! - batch update: body `{job_uuid, Hostname, Message, State}`.
//!
//! Keys match case-insensitively (`Hostname`, `hostname`, `HOSTNAME`, ...).
//! A missing `Hostname` or `Message` is an empty string; a missing `State`
//! is an unknown state. The batch form must name a non-empty `job_uuid`.

use jobstatus_core::job_id::validate_job_id;
use jobstatus_core::JobState;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Body of `POST /{uuid}/status`, after key folding.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessagePost {
    pub hostname: String,
    pub message: String,
    pub state: String,
}

/// Body of `POST /status/batch`, after key folding.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BatchMessagePost {
    pub job_uuid: String,
    pub hostname: String,
    pub message: String,
    pub state: String,
}

/// A validated status report, ready for the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdateRequest {
    pub job_id: String,
    pub hostname: String,
    pub message: String,
    pub state: JobState,
}

/// Decode the single-update form.
///
/// The path ID is checked first: a malformed ID does not name a job at all.
pub fn decode_single(path_job_id: &str, body: &[u8]) -> AppResult<StatusUpdateRequest> {
    validate_job_id(path_job_id)?;
    let post: MessagePost = parse_body(body)?;

    Ok(StatusUpdateRequest {
        job_id: path_job_id.to_string(),
        state: JobState::normalize(&post.state)?,
        hostname: post.hostname,
        message: post.message,
    })
}

/// Decode the batch form.
pub fn decode_batch(body: &[u8]) -> AppResult<StatusUpdateRequest> {
    let post: BatchMessagePost = parse_body(body)?;
    if post.job_uuid.trim().is_empty() {
        return Err(AppError::Decode("job_uuid must not be empty".to_string()));
    }

    Ok(StatusUpdateRequest {
        state: JobState::normalize(&post.state)?,
        job_id: post.job_uuid,
        hostname: post.hostname,
        message: post.message,
    })
}

/// Parse a JSON object, lowercase its keys, then decode it into `T`.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    let object: Map<String, Value> = serde_json::from_slice(body).map_err(decode_error)?;
    let folded = object
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();
    serde_json::from_value(Value::Object(folded)).map_err(decode_error)
}

fn decode_error(e: serde_json::Error) -> AppError {
    AppError::Decode(e.to_string())
}
