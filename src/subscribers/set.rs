//! # SubscriberSet: non-blocking fan-out over multiple subscribers.
//!
//! [`SubscriberSet`] distributes each [`Event`](crate::events::Event) to
//! multiple subscribers **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and reported (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for
//!   that subscriber and a `SubscriberOverflow` event is published).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

/// Identifier returned by [`SubscriberSet::attach`]; pass to
/// [`SubscriberSet::detach`] to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Per-subscriber channel with metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: RwLock<HashMap<SubscriptionId, SubscriberChannel>>,
    next_id: AtomicU64,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and attaches the initial subscribers.
    ///
    /// The `bus` is used to publish `SubscriberOverflow` / `SubscriberPanicked`
    /// health events.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let set = Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            bus,
        };
        for sub in subs {
            set.attach(sub);
        }
        set
    }

    /// Adds a subscriber and spawns its worker task.
    ///
    /// Returns an id usable with [`Self::detach`].
    pub fn attach(&self, sub: Arc<dyn Subscribe>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        let cap = sub.queue_capacity().max(1);
        let name = sub.name();
        let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
        let bus = self.bus.clone();

        let worker = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = sub.on_event(ev.as_ref());
                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    warn!(subscriber = sub.name(), ?panic_err, "subscriber panicked");
                    bus.publish(Event::subscriber_panicked(
                        sub.name(),
                        format!("{panic_err:?}"),
                    ));
                }
            }
        });

        let channel = SubscriberChannel {
            name,
            sender: tx,
            worker,
        };
        self.channels
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, channel);
        id
    }

    /// Removes a subscriber; pending events in its queue are still processed.
    ///
    /// Unknown ids are a benign no-op.
    pub fn detach(&self, id: SubscriptionId) {
        let removed = self
            .channels
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&id);
        // Dropping the sender lets the worker drain and exit on its own.
        drop(removed.map(|c| c.sender));
    }

    /// Fans one event out to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is full or closed, the event is dropped for it
    /// and a `SubscriberOverflow` event is published. Overflow of health
    /// events themselves is only logged, so a saturated subscriber cannot
    /// amplify its own overflow.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        let channels = self.channels.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        for channel in channels.values() {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.report_drop(channel.name, "full", ev.kind);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.report_drop(channel.name, "closed", ev.kind);
                }
            }
        }
    }

    fn report_drop(&self, name: &'static str, reason: &'static str, dropped: EventKind) {
        warn!(subscriber = name, reason, ?dropped, "subscriber dropped event");
        let health = matches!(
            dropped,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        );
        if !health {
            self.bus.publish(Event::subscriber_overflow(name, reason));
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    ///
    /// Idempotent; a second call finds no channels left and returns.
    pub async fn shutdown(&self) {
        let workers: Vec<JoinHandle<()>> = {
            let mut channels = self.channels.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            channels.drain().map(|(_, c)| c.worker).collect()
        };
        for h in workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}
