//! Job status domain types.
//!
//! - [`JobState`] -- the canonical job lifecycle enum and the mapper that
//!   normalizes free-form state strings into it.
//! - [`UpdateMessage`] -- the event published to the exchange for every
//!   accepted status report.
//! - [`job_id`] -- the invocation ID pattern accepted on the URL path.

pub mod error;
pub mod job_id;
pub mod job_state;
pub mod update;

pub use error::CoreError;
pub use job_state::JobState;
pub use update::{JobReference, UpdateMessage};
