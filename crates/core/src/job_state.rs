//! Canonical job lifecycle states and the state mapper.
//!
//! Job-execution agents report state as free-form text (`"running"`,
//! `"COMPLETED"`, ...). [`JobState::normalize`] folds every recognized
//! spelling into exactly one [`JobState`] so consumers of the exchange only
//! ever see the four canonical values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Canonical job lifecycle state carried by every update message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Submitted,
    Running,
    Succeeded,
    Failed,
}

/// Lowercase report spellings and the canonical state each one maps to.
///
/// `completed` is the spelling older agents send for a successful job.
const STATE_ALIASES: [(&str, JobState); 5] = [
    ("submitted", JobState::Submitted),
    ("running", JobState::Running),
    ("completed", JobState::Succeeded),
    ("succeeded", JobState::Succeeded),
    ("failed", JobState::Failed),
];

impl JobState {
    /// Every canonical state, in lifecycle order.
    pub const ALL: [JobState; 4] = [
        JobState::Submitted,
        JobState::Running,
        JobState::Succeeded,
        JobState::Failed,
    ];

    /// Wire name of the state, identical to its serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Submitted => "Submitted",
            JobState::Running => "Running",
            JobState::Succeeded => "Succeeded",
            JobState::Failed => "Failed",
        }
    }

    /// Map a reported state string onto its canonical state.
    ///
    /// Matching is case-insensitive. Anything outside the alias table is
    /// rejected with [`CoreError::UnknownState`] carrying the original input.
    pub fn normalize(input: &str) -> Result<JobState, CoreError> {
        let lowered = input.to_ascii_lowercase();
        STATE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map(|(_, state)| *state)
            .ok_or_else(|| CoreError::UnknownState(input.to_string()))
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::normalize(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
