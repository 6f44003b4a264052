//! # Global runtime configuration.
//!
//! Provides [`Config`], the construction-time options shared by the queue
//! manager, the worker pool, and the connection supervisors.
//!
//! ## Sentinel values
//! - `owner_cap = 0` → treated as 1 (one active job per owner)
//! - `job_timeout = 0s` → no deadline (treated as `None` by [`Config::default_deadline`])
//! - `max_retries = 0` → fail a job on the first connection loss
//! - `max_consecutive_failures = 0` → never park a worker for ordinary failures

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Named options supplied at construction.
///
/// Defines:
/// - **Admission**: per-owner concurrency cap
/// - **Recovery**: reconnect backoff and retry budget
/// - **Deadlines**: default per-job execution deadline
/// - **Shutdown**: grace period for draining in-flight jobs
/// - **Events**: bus ring-buffer capacity
///
/// All fields are public; prefer the accessors to avoid sprinkling sentinel
/// checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum active (pending + in-progress) jobs per owner.
    ///
    /// `0` is clamped to 1. Exceeding the cap rejects a submission with
    /// `SubmitError::DuplicateOwner`.
    pub owner_cap: usize,

    /// Reconnect delay policy for the connection supervisor.
    ///
    /// Defaults to exponential: base 1s, factor 2.0, cap 30s.
    pub backoff: BackoffPolicy,

    /// Consecutive reconnect failures tolerated before the supervisor
    /// reports exhaustion and the worker enters `Error`.
    pub max_retries: u32,

    /// Default execution deadline per job.
    ///
    /// - `Duration::ZERO` = no deadline
    /// - `> 0` = applied to jobs that carry no deadline of their own
    pub job_timeout: Duration,

    /// Maximum time to wait for in-flight jobs during graceful shutdown.
    pub grace: Duration,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events
    /// observe `Lagged` and skip older items. Minimum value is 1.
    pub bus_capacity: usize,

    /// Consecutive failed jobs tolerated before a worker is parked in
    /// `Error` even without an exhausted retry budget.
    ///
    /// `0` disables the counter.
    pub max_consecutive_failures: u32,
}

impl Config {
    /// Returns the per-owner cap with the `0` sentinel clamped to 1.
    #[inline]
    pub fn owner_cap_clamped(&self) -> usize {
        self.owner_cap.max(1)
    }

    /// Returns the default job deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → applied per job unless the job carries its own
    #[inline]
    pub fn default_deadline(&self) -> Option<Duration> {
        if self.job_timeout == Duration::ZERO {
            None
        } else {
            Some(self.job_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `owner_cap = 1` (one active job per owner)
    /// - `backoff = base 1s, factor 2.0, cap 30s` (no jitter)
    /// - `max_retries = 5`
    /// - `job_timeout = 0s` (no deadline)
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `max_consecutive_failures = 5`
    fn default() -> Self {
        Self {
            owner_cap: 1,
            backoff: BackoffPolicy::default(),
            max_retries: 5,
            job_timeout: Duration::ZERO,
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            max_consecutive_failures: 5,
        }
    }
}
