//! # Notification events emitted by the queue, workers, and supervisors.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Job lifecycle**: enqueue through exactly one terminal event
//! - **Connection**: loss, scheduled reconnects, restoration
//! - **Worker lifecycle**: error parking, reset, stop
//! - **Runtime health**: shutdown, subscriber overflow/panic
//!
//! The [`Event`] struct carries optional metadata such as the job id, the
//! worker name, a human-readable reason, and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are observed
//! out of order by independent subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::jobs::JobId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of notification events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Job lifecycle ===
    /// Job admitted to the queue.
    ///
    /// Sets: `job`, `owner`, `tier`, `position`.
    Enqueued,

    /// Job claimed by a worker; execution is about to begin.
    ///
    /// Sets: `job`, `owner`, `worker`.
    Started,

    /// Behavior-reported progress for an in-flight job.
    ///
    /// Sets: `job`, `worker`, `reason` (progress note).
    Progress,

    /// Terminal: job finished successfully.
    ///
    /// Sets: `job`, `worker`, `payload` (optional result).
    Completed,

    /// Terminal: job failed (timeout, exhausted retries, fatal error).
    ///
    /// Sets: `job`, `worker` (when claimed), `reason`.
    Failed,

    /// Terminal: job cancelled (while pending or cooperatively in flight).
    ///
    /// Sets: `job`, `reason` (when available).
    Cancelled,

    // === Connection ===
    /// The worker's connection dropped mid-operation.
    ///
    /// Sets: `worker`, `reason`.
    ConnectionLost,

    /// A reconnect attempt has been scheduled.
    ///
    /// Sets: `worker`, `attempt` (retry count), `delay_ms`.
    BackoffScheduled,

    /// The connection was re-established; retry count reset to zero.
    ///
    /// Sets: `worker`, `attempt` (attempts it took).
    ConnectionRestored,

    // === Worker lifecycle ===
    /// Worker entered `Error` and stopped claiming jobs.
    ///
    /// Sets: `worker`, `reason`.
    WorkerErrored,

    /// Worker was administratively reset from `Error` back to `Idle`.
    ///
    /// Sets: `worker`.
    WorkerReset,

    /// Worker finished draining and reached `Stopped`.
    ///
    /// Sets: `worker`.
    WorkerStopped,

    // === Runtime health ===
    /// Shutdown requested; workers stop claiming new jobs.
    ShutdownRequested,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `worker` (subscriber name), `reason`.
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `worker` (subscriber name), `reason` (panic info).
    SubscriberPanicked,
}

impl EventKind {
    /// True for the three terminal job events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::Completed | EventKind::Failed | EventKind::Cancelled
        )
    }
}

/// Notification event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Job the event refers to, if any.
    pub job: Option<JobId>,
    /// Owner of the job, if applicable.
    pub owner: Option<Arc<str>>,
    /// Worker (or subscriber) name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (errors, progress notes, panic info).
    pub reason: Option<Arc<str>>,
    /// Priority tier (Enqueued).
    pub tier: Option<u8>,
    /// 1-indexed queue position (Enqueued).
    pub position: Option<usize>,
    /// Attempt / retry counter, 1-based.
    pub attempt: Option<u32>,
    /// Backoff delay before the next reconnect attempt, in milliseconds.
    pub delay_ms: Option<u32>,
    /// Result payload (Completed).
    pub payload: Option<Arc<[u8]>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next global sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            owner: None,
            worker: None,
            reason: None,
            tier: None,
            position: None,
            attempt: None,
            delay_ms: None,
            payload: None,
        }
    }

    /// Attaches the job id.
    #[inline]
    pub fn with_job(mut self, id: JobId) -> Self {
        self.job = Some(id);
        self
    }

    /// Attaches the owner identity.
    #[inline]
    pub fn with_owner(mut self, owner: impl Into<Arc<str>>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Attaches a worker (or subscriber) name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the priority tier.
    #[inline]
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Attaches a 1-indexed queue position.
    #[inline]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Attaches an attempt / retry counter.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a result payload.
    #[inline]
    pub fn with_payload(mut self, payload: impl Into<Arc<[u8]>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }
}
