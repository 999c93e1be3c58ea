//! Invocation ID validation.
//!
//! The single-update route addresses a job by a lowercase-hex, hyphenated
//! UUID-shaped identifier. Anything else does not name a job.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Pattern an invocation ID taken from the URL path must match.
pub const JOB_ID_PATTERN: &str =
    r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$";

/// Compiled [`JOB_ID_PATTERN`]. Compiled once, reused forever.
static JOB_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(JOB_ID_PATTERN).expect("valid regex"));

/// Whether `id` has the shape of an invocation ID.
pub fn is_valid_job_id(id: &str) -> bool {
    JOB_ID_RE.is_match(id)
}

/// Validate an invocation ID, returning [`CoreError::InvalidJobId`] on mismatch.
pub fn validate_job_id(id: &str) -> Result<(), CoreError> {
    if is_valid_job_id(id) {
        Ok(())
    } else {
        Err(CoreError::InvalidJobId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_hex_uuid() {
        assert!(is_valid_job_id("11111111-1111-1111-1111-111111111111"));
        assert!(is_valid_job_id("0a1b2c3d-4e5f-6a7b-8c9d-0e1f2a3b4c5d"));
    }

    #[test]
    fn rejects_uppercase_hex() {
        assert!(!is_valid_job_id("0A1B2C3D-4E5F-6A7B-8C9D-0E1F2A3B4C5D"));
    }

    #[test]
    fn rejects_wrong_group_lengths() {
        assert!(!is_valid_job_id("1111111-1111-1111-1111-111111111111"));
        assert!(!is_valid_job_id("11111111-1111-1111-1111-1111111111111"));
        assert!(!is_valid_job_id("11111111111111111111111111111111"));
    }

    #[test]
    fn rejects_surrounding_text() {
        assert!(!is_valid_job_id("x11111111-1111-1111-1111-111111111111"));
        assert!(!is_valid_job_id("11111111-1111-1111-1111-111111111111/status"));
        assert!(!is_valid_job_id(""));
    }

    #[test]
    fn validate_reports_offending_id() {
        let err = validate_job_id("not-a-job").unwrap_err();
        assert_eq!(err.to_string(), "Invalid job ID: not-a-job");
    }
}
