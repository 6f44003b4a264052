//! Notification events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the queue manager,
//! worker actors, and connection supervisors.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `QueueManager` (Enqueued/Started/terminal events for
//!   pending jobs), `BotActor` (terminal events, worker transitions),
//!   `ConnectionSupervisor` (loss/backoff/restore), `SubscriberSet`
//!   (overflow/panic).
//! - **Consumers**: the pool's dispatcher loop, which fans out to the
//!   [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Ordering
//! Every event carries a globally monotonic `seq`. All events for one job
//! are published from its admission/claim/outcome path in program order, so
//! per-job ordering (Enqueued before Started before a terminal event) holds
//! end to end; no ordering is promised across different jobs.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
