//! Error types used by the botvisor runtime.
//!
//! The taxonomy splits by where an error surfaces:
//!
//! - [`SubmitError`], [`CancelError`], [`QueueError`] — synchronous results
//!   of producer/worker calls into the queue manager.
//! - [`ConnectionError`] — transport failures, transient vs fatal.
//! - [`JobError`] — failures of a single job execution attempt.
//! - [`StateError`] — illegal worker state transitions; a programming
//!   contract violation, fatal to the calling operation.
//! - [`RegisterError`], [`RuntimeError`] — pool-level registration and
//!   shutdown failures.
//!
//! Everything that happens after a job is claimed surfaces asynchronously
//! through the event bus as exactly one terminal event per job; these enums
//! cover the synchronous edges. Each enum provides `as_label()` returning a
//! short stable snake_case label for logs/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::jobs::JobId;
use crate::workers::BotState;

/// Synchronous rejection of a `submit` call. Rejected jobs are never enqueued.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Malformed or missing job fields.
    #[error("invalid job: {reason}")]
    Invalid {
        /// What was wrong with the request.
        reason: String,
    },

    /// A job with the same id is already pending or in progress.
    #[error("job {id} already active")]
    DuplicateJob {
        /// The offending job id.
        id: JobId,
    },

    /// The owner's concurrency cap would be exceeded.
    #[error("owner '{owner}' already has {cap} active job(s)")]
    DuplicateOwner {
        /// Owner identity.
        owner: String,
        /// The configured per-owner cap.
        cap: usize,
    },

    /// The queue manager has been shut down.
    #[error("queue is shut down")]
    Shutdown,
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::Invalid { .. } => "submit_invalid",
            SubmitError::DuplicateJob { .. } => "submit_duplicate_job",
            SubmitError::DuplicateOwner { .. } => "submit_duplicate_owner",
            SubmitError::Shutdown => "submit_shutdown",
        }
    }
}

/// Synchronous rejection of a `cancel` call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    /// The job is neither pending nor in progress.
    #[error("job {id} not found")]
    NotFound {
        /// The requested job id.
        id: JobId,
    },

    /// The caller is not the owner of the job.
    #[error("job {id} is not owned by '{requested_by}'")]
    NotPermitted {
        /// The requested job id.
        id: JobId,
        /// Identity that asked for cancellation.
        requested_by: String,
    },

    /// The job is already claimed and its cancellable flag is false.
    #[error("job {id} is in progress and not cancellable")]
    NotCancellable {
        /// The requested job id.
        id: JobId,
    },
}

impl CancelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CancelError::NotFound { .. } => "cancel_not_found",
            CancelError::NotPermitted { .. } => "cancel_not_permitted",
            CancelError::NotCancellable { .. } => "cancel_not_cancellable",
        }
    }
}

/// Errors surfaced to workers blocked in `claim_next`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue manager was shut down; no further jobs will be handed out.
    #[error("queue is shut down")]
    Shutdown,
}

/// Failure of the external connection, raised by `Connector`/`Connection`.
///
/// Transient errors trigger the supervisor's reconnect loop and remain
/// invisible to the producer unless retries are exhausted; fatal errors
/// surface immediately as job failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Recoverable failure (timeout, reset, dropped link).
    #[error("transient connection error: {reason}")]
    Transient {
        /// Underlying failure description.
        reason: String,
    },

    /// Non-recoverable failure (auth rejection, protocol violation).
    #[error("fatal connection error: {reason}")]
    Fatal {
        /// Underlying failure description.
        reason: String,
    },
}

impl ConnectionError {
    /// Convenience constructor for a transient error.
    pub fn transient(reason: impl Into<String>) -> Self {
        ConnectionError::Transient {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for a fatal error.
    pub fn fatal(reason: impl Into<String>) -> Self {
        ConnectionError::Fatal {
            reason: reason.into(),
        }
    }

    /// True when the supervisor should attempt reconnection.
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectionError::Transient { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectionError::Transient { .. } => "connection_transient",
            ConnectionError::Fatal { .. } => "connection_fatal",
        }
    }
}

/// Failure of a single job execution.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// The job exceeded its execution deadline.
    #[error("deadline {deadline:?} exceeded")]
    Timeout {
        /// The deadline that was exceeded.
        deadline: Duration,
    },

    /// The connection failed during execution.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The connection supervisor gave up after its retry budget.
    #[error("connection retries exhausted after {attempts} attempt(s)")]
    ExhaustedRetries {
        /// Number of reconnect attempts made.
        attempts: u32,
    },

    /// Behavior failed and should not be retried.
    #[error("fatal error (no retry): {reason}")]
    Fatal {
        /// Underlying failure description.
        reason: String,
    },

    /// Behavior failed but may succeed if retried.
    #[error("execution failed: {reason}")]
    Fail {
        /// Underlying failure description.
        reason: String,
    },

    /// The job was cancelled cooperatively.
    #[error("job cancelled")]
    Canceled,
}

impl JobError {
    /// True when a retry of the same job could succeed.
    ///
    /// Only transient connection losses restart the in-flight job, and only
    /// when the job itself is marked retryable.
    ///
    /// # Example
    /// ```
    /// use botvisor::{ConnectionError, JobError};
    ///
    /// let lost = JobError::Connection(ConnectionError::transient("reset by peer"));
    /// assert!(lost.is_retryable());
    ///
    /// let failed = JobError::Fail { reason: "bad frame".into() };
    /// assert!(!failed.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Connection(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Timeout { .. } => "job_timeout",
            JobError::Connection(e) => e.as_label(),
            JobError::ExhaustedRetries { .. } => "job_exhausted_retries",
            JobError::Fatal { .. } => "job_fatal",
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
        }
    }
}

/// Illegal worker state-machine operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The attempted transition violates the state machine.
    #[error("illegal transition {from:?} -> {to:?}")]
    Conflict {
        /// State the worker was in.
        from: BotState,
        /// State the caller asked for.
        to: BotState,
    },

    /// No worker registered under the given id.
    #[error("unknown worker '{worker}'")]
    UnknownWorker {
        /// The requested worker id.
        worker: String,
    },
}

impl StateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StateError::Conflict { .. } => "state_conflict",
            StateError::UnknownWorker { .. } => "state_unknown_worker",
        }
    }
}

/// Failure to register a worker with the pool.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// A worker with the same id is already registered.
    #[error("worker '{worker}' already registered")]
    DuplicateWorker {
        /// The conflicting worker id.
        worker: String,
    },

    /// The pool is shutting down and accepts no new workers.
    #[error("pool is shutting down")]
    Shutdown,
}

impl RegisterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegisterError::DuplicateWorker { .. } => "register_duplicate_worker",
            RegisterError::Shutdown => "register_shutdown",
        }
    }
}

/// Pool-level runtime failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Workers did not drain within the shutdown grace window.
    #[error("{stuck} worker(s) still running after grace {grace:?}")]
    GraceExceeded {
        /// The grace window that elapsed.
        grace: Duration,
        /// How many workers had not stopped when it elapsed.
        stuck: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
