//! # Job requests.
//!
//! [`JobRequest`] is the unit of work a producer submits. It is immutable
//! once enqueued; the queue stamps the enqueue timestamp and a monotonic
//! sequence number at admission, which together with the tier define the
//! total dequeue order.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

/// Globally unique job identifier.
pub type JobId = Uuid;

/// A unit of requested work.
///
/// Created by a producer; opaque to the core except for the routing fields
/// (`owner`, `tier`, `kind`) and the two execution flags.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use botvisor::JobRequest;
///
/// let job = JobRequest::new("alice", "move-arm", b"target=37".to_vec())
///     .with_tier(2)
///     .with_deadline(Duration::from_secs(30))
///     .with_retryable(false);
///
/// assert_eq!(job.tier, 2);
/// assert!(job.cancellable);
/// assert!(!job.retryable);
/// ```
#[derive(Clone, Debug)]
pub struct JobRequest {
    /// Unique id, generated at construction.
    pub id: JobId,
    /// Identity on whose behalf the job runs; subject to the owner cap.
    pub owner: Arc<str>,
    /// Behavior selector; the registry maps it to an executable behavior.
    pub kind: Arc<str>,
    /// Priority tier; higher values dequeue first.
    pub tier: u8,
    /// Opaque payload handed to the behavior.
    pub payload: Vec<u8>,
    /// Whether the job may be cancelled once claimed.
    pub cancellable: bool,
    /// Whether the job may be re-run after a transient connection loss.
    pub retryable: bool,
    /// Per-job execution deadline; `None` falls back to the config default.
    pub deadline: Option<Duration>,
}

impl JobRequest {
    /// Creates a new request with a fresh id, tier 0, cancellable and
    /// retryable, no deadline.
    pub fn new(owner: impl Into<Arc<str>>, kind: impl Into<Arc<str>>, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            kind: kind.into(),
            tier: 0,
            payload,
            cancellable: true,
            retryable: true,
            deadline: None,
        }
    }

    /// Sets the priority tier.
    #[inline]
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }

    /// Sets the per-job execution deadline.
    #[inline]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets whether the job may be cancelled once claimed.
    #[inline]
    pub fn with_cancellable(mut self, cancellable: bool) -> Self {
        self.cancellable = cancellable;
        self
    }

    /// Sets whether the job survives a transient connection loss.
    #[inline]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}
