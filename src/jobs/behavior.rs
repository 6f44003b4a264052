//! # Per-kind job behaviors.
//!
//! [`Behavior`] is the polymorphic execution interface: one implementation
//! per job kind, resolved through a [`BehaviorRegistry`] when a worker picks
//! the job up. This replaces conditional dispatch over job types with a
//! trait object selected once per job.
//!
//! A behavior receives the claimed [`JobRequest`], exclusive access to the
//! worker's [`Connection`], and a [`JobContext`] for cooperative
//! cancellation and progress reporting.
//!
//! ## Cancellation contract
//! Behaviors must check `ctx.is_cancelled()` (or select on
//! `ctx.cancelled()`) at their own checkpoints and return
//! `Err(JobError::Canceled)` promptly; the runtime never aborts a behavior
//! mid-instruction.
//!
//! ## Example
//! ```no_run
//! use async_trait::async_trait;
//! use botvisor::{Behavior, Connection, JobContext, JobError, JobRequest};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Behavior for Echo {
//!     async fn execute(
//!         &self,
//!         job: &JobRequest,
//!         conn: &mut dyn Connection,
//!         ctx: &JobContext,
//!     ) -> Result<Option<Vec<u8>>, JobError> {
//!         conn.send(&job.payload).await?;
//!         ctx.progress("sent");
//!         let reply = conn.receive().await?;
//!         Ok(Some(reply))
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::connection::Connection;
use crate::error::JobError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{JobId, JobRequest};

/// Executes jobs of one kind against a device connection.
#[async_trait]
pub trait Behavior: Send + Sync + 'static {
    /// Runs the job to completion or failure.
    ///
    /// Transient [`ConnectionError`](crate::ConnectionError)s returned from
    /// the connection bubble up as `JobError::Connection`; the worker then
    /// drives recovery and, for retryable jobs, re-invokes `execute` from
    /// the start. Implementations should therefore be restartable.
    async fn execute(
        &self,
        job: &JobRequest,
        conn: &mut dyn Connection,
        ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError>;
}

/// Maps job kinds to behaviors.
///
/// Shared read-only across the pool; built once at construction. A job
/// whose kind has no registered behavior fails fatally (no retry).
#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    behaviors: HashMap<Arc<str>, Arc<dyn Behavior>>,
}

impl BehaviorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a behavior for a job kind, replacing any previous one.
    pub fn register(mut self, kind: impl Into<Arc<str>>, behavior: Arc<dyn Behavior>) -> Self {
        self.behaviors.insert(kind.into(), behavior);
        self
    }

    /// Looks up the behavior for a kind.
    pub fn resolve(&self, kind: &str) -> Option<Arc<dyn Behavior>> {
        self.behaviors.get(kind).cloned()
    }

    /// Registered kinds, unordered.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.behaviors.keys().map(|k| &**k)
    }
}

/// Per-job execution context handed to behaviors.
///
/// Carries the cooperative cancellation token (triggered by producer
/// cancellation, deadline expiry, or forced shutdown) and the progress hook.
#[derive(Clone)]
pub struct JobContext {
    job: JobId,
    worker: Arc<str>,
    cancel: CancellationToken,
    bus: Bus,
}

impl JobContext {
    /// Creates a context for one job execution. Used by the worker actor.
    pub(crate) fn new(job: JobId, worker: Arc<str>, cancel: CancellationToken, bus: Bus) -> Self {
        Self {
            job,
            worker,
            cancel,
            bus,
        }
    }

    /// The id of the job being executed.
    pub fn job_id(&self) -> JobId {
        self.job
    }

    /// The id of the worker executing it.
    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when cancellation is requested; usable in `select!`.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Publishes a `Progress` event for this job. Never blocks.
    pub fn progress(&self, note: impl Into<Arc<str>>) {
        self.bus.publish(
            Event::now(EventKind::Progress)
                .with_job(self.job)
                .with_worker(Arc::clone(&self.worker))
                .with_reason(note),
        );
    }
}
