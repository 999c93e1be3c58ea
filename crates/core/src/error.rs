/// Domain errors raised while validating an inbound status report.
///
/// Neither variant ever reaches the publisher: both are resolved by the
/// HTTP layer before a publish is attempted.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown job state: {0}")]
    UnknownState(String),

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),
}
