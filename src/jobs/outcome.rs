//! # Terminal job outcomes.
//!
//! Every claimed job resolves to exactly one [`JobOutcome`], reported back
//! to the queue manager, which emits the matching terminal event
//! (`Completed` / `Failed` / `Cancelled`) exactly once.

use std::time::Duration;

/// Terminal result of a claimed job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The behavior finished; carries its optional result payload.
    Completed(Option<Vec<u8>>),
    /// The job failed; see [`FailureReason`].
    Failed(FailureReason),
    /// The job was cancelled cooperatively (producer cancel or forced stop).
    Cancelled {
        /// Why the cancellation happened ("requested", "shutdown", ...).
        reason: String,
    },
}

impl JobOutcome {
    /// Shorthand for a cancellation with a reason.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        JobOutcome::Cancelled {
            reason: reason.into(),
        }
    }
}

/// Why a job failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The execution deadline expired.
    Timeout {
        /// The deadline that was exceeded.
        deadline: Duration,
    },
    /// Reconnect budget exhausted while the job was in flight.
    ExhaustedRetries {
        /// Reconnect attempts made before giving up.
        attempts: u32,
    },
    /// The connection failed fatally, or was lost under a non-retryable job.
    ConnectionLost {
        /// Underlying failure description.
        detail: String,
    },
    /// The behavior itself reported an error.
    Behavior {
        /// Underlying failure description.
        detail: String,
    },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Timeout { deadline } => write!(f, "deadline {deadline:?} exceeded"),
            FailureReason::ExhaustedRetries { attempts } => {
                write!(f, "connection retries exhausted after {attempts} attempt(s)")
            }
            FailureReason::ConnectionLost { detail } => write!(f, "connection lost: {detail}"),
            FailureReason::Behavior { detail } => write!(f, "behavior failed: {detail}"),
        }
    }
}
