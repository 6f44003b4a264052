//! # Logging subscriber for debugging and demos.
//!
//! [`LogWriter`] forwards events to `tracing` in a compact key=value form.
//!
//! ## Output shape
//! ```text
//! enqueued job=… owner=alice tier=2 position=1
//! started job=… worker=bot-1
//! backoff_scheduled worker=bot-1 attempt=2 delay_ms=2000
//! failed job=… worker=bot-1 reason="connection retries exhausted after 5 attempt(s)"
//! ```
//!
//! Useful for development and the demo binaries. For metrics or alerting
//! implement a custom [`Subscribe`].

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Built-in subscriber that logs every event through `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Creates a new log writer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.map(|id| id.to_string());
        let job = job.as_deref();
        let worker = e.worker.as_deref();
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::Enqueued => {
                info!(job, owner = e.owner.as_deref(), tier = e.tier, position = e.position, "enqueued");
            }
            EventKind::Started => {
                info!(job, worker, "started");
            }
            EventKind::Progress => {
                info!(job, worker, note = reason, "progress");
            }
            EventKind::Completed => {
                info!(job, worker, "completed");
            }
            EventKind::Failed => {
                warn!(job, worker, reason, "failed");
            }
            EventKind::Cancelled => {
                info!(job, reason, "cancelled");
            }
            EventKind::ConnectionLost => {
                warn!(worker, reason, "connection lost");
            }
            EventKind::BackoffScheduled => {
                info!(worker, attempt = e.attempt, delay_ms = e.delay_ms, "backoff scheduled");
            }
            EventKind::ConnectionRestored => {
                info!(worker, attempt = e.attempt, "connection restored");
            }
            EventKind::WorkerErrored => {
                warn!(worker, reason, "worker errored");
            }
            EventKind::WorkerReset => {
                info!(worker, "worker reset");
            }
            EventKind::WorkerStopped => {
                info!(worker, "worker stopped");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = worker, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = worker, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
