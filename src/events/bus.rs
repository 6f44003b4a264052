//! # Event bus for broadcasting notification events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (queue manager,
//! worker actors, connection supervisors).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Subscriber (one):
//!   QueueManager ──┐
//!   BotActor 1   ──┼──────► Bus ───────► dispatcher loop ────► SubscriberSet
//!   BotActor N   ──┤  (broadcast chan)     (in Pool)
//!   ConnSup * N  ──┘
//! ```
//!
//! The pool runs a single dispatcher that fans events out to user-defined
//! subscribers via [`SubscriberSet`](crate::subscribers::SubscriberSet), so
//! publishing can never stall a submit or claim call.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: one ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events sent with no active receivers are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for notification events.
///
/// Multiple publishers can publish concurrently; subscribers receive clones
/// of each event. Cheap to clone (internally an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to >= 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// Returns immediately; if there are no receivers the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes subsequent events.
    ///
    /// Each call creates an independent receiver which only sees events sent
    /// after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
