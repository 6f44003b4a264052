//! # ConnectionSupervisor: single-connection recovery.
//!
//! Owns one [`Connector`] and at most one live [`Connection`], and hides the
//! link's unreliability behind a reconnect loop:
//!
//! ```text
//! mark_lost(reason) ──► status = Reconnecting, publish ConnectionLost
//!
//! reconnect(token):
//! loop {
//!   ├─► attempts >= max_retries ─► status = Failed ─► Exhausted
//!   ├─► delay = backoff.delay(attempts)          (1s, 2s, 4s, … capped)
//!   ├─► publish BackoffScheduled { attempt, delay }
//!   ├─► sleep(delay)                             (cancellable)
//!   └─► connector.connect()
//!         ├─ Ok    ─► retry_count = 0, status = Connected,
//!         │           publish ConnectionRestored ─► Restored
//!         ├─ Err(transient) ─► attempts += 1, continue
//!         └─ Err(fatal)     ─► status = Failed ─► Exhausted
//! }
//! ```
//!
//! ## Rules
//! - One supervisor per worker; the handle is never shared.
//! - A successful connect resets the retry count to zero.
//! - Reconnect waits suspend only the owning worker (cancellable sleep).
//! - The supervisor publishes connection events; job-level consequences
//!   (failing the in-flight job, entering `Error`) belong to the worker.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, Connector};
use crate::error::ConnectionError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;

/// Observable state of the supervised link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Link is up.
    Connected,
    /// Link lost; reconnect attempts in progress (or about to start).
    Reconnecting,
    /// Retry budget exhausted or fatal failure; no further attempts until
    /// the worker is reset.
    Failed,
}

/// Snapshot of a supervisor's state, for the admin surface.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Endpoint identity from the connector.
    pub endpoint: String,
    /// Current link status.
    pub status: ConnectionStatus,
    /// Consecutive failed attempts since the last successful connect.
    pub retry_count: u32,
    /// When the last connect attempt was made, if any.
    pub last_attempt: Option<SystemTime>,
}

/// Result of a recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnect {
    /// Link is up; `attempts` is 0 when it was already connected.
    Restored {
        /// Connect attempts it took this time.
        attempts: u32,
    },
    /// Retry budget exhausted (or fatal error); worker should enter `Error`.
    Exhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// The wait was cancelled by shutdown or a forced stop.
    Cancelled,
}

/// Supervises exactly one worker's connection.
pub struct ConnectionSupervisor {
    connector: Arc<dyn Connector>,
    conn: Option<Box<dyn Connection>>,
    backoff: BackoffPolicy,
    max_retries: u32,
    status: ConnectionStatus,
    retry_count: u32,
    last_attempt: Option<SystemTime>,
    worker: Arc<str>,
    bus: Bus,
}

impl ConnectionSupervisor {
    /// Creates a supervisor for one worker; the link starts unopened.
    pub fn new(
        connector: Arc<dyn Connector>,
        backoff: BackoffPolicy,
        max_retries: u32,
        worker: Arc<str>,
        bus: Bus,
    ) -> Self {
        Self {
            connector,
            conn: None,
            backoff,
            max_retries,
            status: ConnectionStatus::Reconnecting,
            retry_count: 0,
            last_attempt: None,
            worker,
            bus,
        }
    }

    /// Snapshot for the admin surface.
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            endpoint: self.connector.endpoint().to_string(),
            status: self.status,
            retry_count: self.retry_count,
            last_attempt: self.last_attempt,
        }
    }

    /// Exclusive access to the live connection, if any.
    pub fn connection(&mut self) -> Option<&mut Box<dyn Connection>> {
        self.conn.as_mut()
    }

    /// True while a live connection is held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Records a mid-operation loss: drops the link, flips the status, and
    /// publishes `ConnectionLost`. Call before [`Self::reconnect`].
    pub async fn mark_lost(&mut self, reason: &str) {
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
        self.status = ConnectionStatus::Reconnecting;
        self.bus.publish(
            Event::now(EventKind::ConnectionLost)
                .with_worker(Arc::clone(&self.worker))
                .with_reason(reason.to_string()),
        );
    }

    /// Makes sure the link is up, opening it on first use.
    ///
    /// An already-connected link returns `Restored { attempts: 0 }` without
    /// publishing anything. The initial open is attempted immediately; on a
    /// transient failure the delayed reconnect loop takes over.
    pub async fn ensure_connected(&mut self, token: &CancellationToken) -> Reconnect {
        if self.conn.is_some() {
            return Reconnect::Restored { attempts: 0 };
        }

        self.last_attempt = Some(SystemTime::now());
        match self.connector.connect().await {
            Ok(conn) => {
                self.adopt(conn);
                Reconnect::Restored { attempts: 0 }
            }
            Err(e) if e.is_transient() => {
                self.status = ConnectionStatus::Reconnecting;
                self.reconnect(token).await
            }
            Err(_fatal) => {
                self.status = ConnectionStatus::Failed;
                Reconnect::Exhausted { attempts: 1 }
            }
        }
    }

    /// Runs the delayed reconnect loop until restored, exhausted, or cancelled.
    pub async fn reconnect(&mut self, token: &CancellationToken) -> Reconnect {
        loop {
            if self.retry_count >= self.max_retries {
                let attempts = self.retry_count;
                self.status = ConnectionStatus::Failed;
                return Reconnect::Exhausted { attempts };
            }

            // retry_count counts completed failures this outage, so it
            // indexes the backoff sequence directly: 1s, 2s, 4s, ... capped.
            let delay = self.backoff.delay(self.retry_count);
            let attempt = self.retry_count + 1;
            self.bus.publish(
                Event::now(EventKind::BackoffScheduled)
                    .with_worker(Arc::clone(&self.worker))
                    .with_attempt(attempt)
                    .with_delay(delay),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => return Reconnect::Cancelled,
            }

            self.last_attempt = Some(SystemTime::now());
            match self.connector.connect().await {
                Ok(conn) => {
                    self.adopt(conn);
                    self.bus.publish(
                        Event::now(EventKind::ConnectionRestored)
                            .with_worker(Arc::clone(&self.worker))
                            .with_attempt(attempt),
                    );
                    return Reconnect::Restored { attempts: attempt };
                }
                Err(e) if e.is_transient() => {
                    self.retry_count = self.retry_count.saturating_add(1);
                }
                Err(_fatal) => {
                    self.status = ConnectionStatus::Failed;
                    return Reconnect::Exhausted {
                        attempts: self.retry_count.saturating_add(1),
                    };
                }
            }
        }
    }

    /// Classifies an execution error and records the loss when transient.
    ///
    /// Returns true when the error is a transient connection loss (and the
    /// supervisor is now in `Reconnecting`).
    pub async fn observe_failure(&mut self, err: &ConnectionError) -> bool {
        if err.is_transient() {
            self.mark_lost(&err.to_string()).await;
            true
        } else {
            if let Some(mut conn) = self.conn.take() {
                conn.close().await;
            }
            self.status = ConnectionStatus::Failed;
            false
        }
    }

    /// Clears `Failed` after an administrative worker reset so the next
    /// claim cycle starts a fresh attempt budget.
    pub fn reset(&mut self) {
        self.retry_count = 0;
        if self.conn.is_none() {
            self.status = ConnectionStatus::Reconnecting;
        }
    }

    /// Closes the link during worker teardown.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
    }

    fn adopt(&mut self, conn: Box<dyn Connection>) {
        self.conn = Some(conn);
        self.status = ConnectionStatus::Connected;
        self.retry_count = 0;
    }
}
