//! # Event subscribers for the botvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out, and a built-in [`LogWriter`] for handling notification events
//! broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   QueueManager / BotActor ── publish(Event) ──► Bus ──► Pool dispatcher
//!                                                             │
//!                                                     SubscriberSet::emit()
//!                                                   ┌─────────┼─────────┐
//!                                                   ▼         ▼         ▼
//!                                              [queue S1] [queue S2] [queue SN]
//!                                                   ▼         ▼         ▼
//!                                              on_event() on_event() on_event()
//! ```
//!
//! ## Isolation rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event for that subscriber only and publishes
//!   `EventKind::SubscriberOverflow`.
//! - Panics are caught per subscriber and published as
//!   `EventKind::SubscriberPanicked`.
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use botvisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Subscribe for Metrics {
//!     async fn on_event(&self, event: &Event) {
//!         if matches!(event.kind, EventKind::Failed) {
//!             // increment a failure counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "metrics" }
//! }
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::{SubscriberSet, SubscriptionId};
pub use subscriber::Subscribe;
