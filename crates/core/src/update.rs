//! The update message published to the exchange.
//!
//! Field names on the wire follow the envelope the exchange's consumers
//! already decode: `Job.uuid`, `State`, `Message`, `Sender`, `SentOn`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job_state::JobState;

/// Reference to the job a status report is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReference {
    /// Invocation ID of the job.
    #[serde(rename = "uuid")]
    pub invocation_id: String,
}

/// A canonical job status update.
///
/// Built once per accepted report via [`UpdateMessage::new`] and never
/// mutated afterwards; the same value is published and echoed back to the
/// reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessage {
    #[serde(rename = "Job")]
    job: JobReference,

    #[serde(rename = "State")]
    state: JobState,

    #[serde(rename = "Message")]
    message: String,

    /// Hostname of the reporting agent.
    #[serde(rename = "Sender")]
    sender: String,

    /// When the update was built (UTC).
    #[serde(rename = "SentOn")]
    sent_on: DateTime<Utc>,
}

impl UpdateMessage {
    pub fn new(
        job_id: impl Into<String>,
        state: JobState,
        sender: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job: JobReference {
                invocation_id: job_id.into(),
            },
            state,
            message: message.into(),
            sender: sender.into(),
            sent_on: Utc::now(),
        }
    }

    pub fn job(&self) -> &JobReference {
        &self.job
    }

    pub fn invocation_id(&self) -> &str {
        &self.job.invocation_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn sent_on(&self) -> DateTime<Utc> {
        self.sent_on
    }
}
