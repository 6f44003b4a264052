//! # botvisor
//!
//! **Botvisor** is a device-automation orchestration core for Rust.
//!
//! It coordinates a fleet of workers ("bots"), each bound to one remote
//! device connection, pulling jobs from a shared priority queue with
//! per-owner fairness, supervised reconnects, and a non-blocking event
//! fan-out for observers. The crate is designed as a building block for
//! higher-level automation services.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producers                        admins
//!      │ submit / cancel               │ spawn / reset / stop / list
//!      ▼                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Pool (composition root)                                          │
//! │  - Bus (broadcast events)                                         │
//! │  - QueueManager (admission + priority order + claims)             │
//! │  - BehaviorRegistry (job kind → Behavior)                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   BotActor   │   │   BotActor   │   │   BotActor   │
//!     │ (claim loop) │   │ (claim loop) │   │ (claim loop) │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │                  │                  │
//!      │ ConnectionSupervisor per actor (backoff reconnects)
//!      │                  │                  │
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          pool event listener
//!                                   ▼
//!                             SubscriberSet
//!                          (per-subscriber queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                    sub1.on   sub2.on   subN.on
//!                     _event()  _event()  _event()
//! ```
//!
//! ### Job lifecycle
//! ```text
//! submit ──► QueueManager (owner cap, tier order) ──► Enqueued
//!
//! BotActor loop {
//!   ├─► ensure connection (delayed reconnects, cancellable)
//!   ├─► claim_next() ──► Started
//!   ├─► Behavior::execute(job, conn, ctx)
//!   │     ├─ Ok                  ─► Completed
//!   │     ├─ cancelled           ─► Cancelled
//!   │     ├─ deadline slice out  ─► Failed(Timeout)
//!   │     └─ transient loss      ─► ConnectionLost
//!   │           ├─ retryable     ─► BackoffScheduled* → ConnectionRestored → resume
//!   │           │                   └─ budget exhausted → Failed, worker → Error
//!   │           └─ non-retryable ─► Failed now, reconnect before next claim
//!   └─► report_outcome() (terminal event exactly once)
//! }
//! ```
//!
//! ## Features
//! | Area             | Description                                                       | Key types / traits                        |
//! |------------------|-------------------------------------------------------------------|-------------------------------------------|
//! | **Queueing**     | Tiered FIFO with per-owner admission caps and cooperative cancel. | [`QueueManager`], [`JobRequest`]          |
//! | **Workers**      | Lifecycle state machine, claim loop, failure parking.             | [`Pool`], [`BotState`], [`WorkerSummary`] |
//! | **Connections**  | Supervised links with bounded exponential backoff.                | [`Connector`], [`ConnectionSupervisor`]   |
//! | **Behaviors**    | Pluggable per-kind job execution.                                 | [`Behavior`], [`BehaviorRegistry`]        |
//! | **Policies**     | Backoff, jitter, and priority-tier mapping.                       | [`BackoffPolicy`], [`TierPolicy`]         |
//! | **Subscribers**  | Hook into lifecycle events (logging, metrics, custom sinks).      | [`Subscribe`], [`SubscriberSet`]          |
//! | **Errors**       | Typed errors per surface.                                         | [`SubmitError`], [`JobError`]             |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use botvisor::{
//!     Behavior, BehaviorRegistry, Config, Connection, ConnectionError, Connector,
//!     JobContext, JobError, JobRequest, LogWriter, Pool, Subscribe,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Behavior for Echo {
//!     async fn execute(
//!         &self,
//!         job: &JobRequest,
//!         conn: &mut dyn Connection,
//!         _ctx: &JobContext,
//!     ) -> Result<Option<Vec<u8>>, JobError> {
//!         conn.send(&job.payload).await?;
//!         Ok(Some(conn.receive().await?))
//!     }
//! }
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl Connector for Loopback {
//!     async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
//!         Err(ConnectionError::fatal("demo connector"))
//!     }
//!     fn endpoint(&self) -> &str {
//!         "loopback:0"
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let pool = Pool::builder(Config::default())
//!         .behaviors(BehaviorRegistry::new().register("echo", Arc::new(Echo)))
//!         .subscribers(subs)
//!         .build();
//!
//!     pool.spawn_worker("bot-1", Arc::new(Loopback)).await?;
//!     let job = JobRequest::new("alice", "echo", b"ping".to_vec());
//!     pool.submit(job).await?;
//!
//!     pool.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod events;
mod jobs;
mod policies;
mod queue;
mod shutdown;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use config::Config;
pub use connection::{
    Connection, ConnectionHandle, ConnectionStatus, ConnectionSupervisor, Connector, Reconnect,
};
pub use error::{
    CancelError, ConnectionError, JobError, QueueError, RegisterError, RuntimeError, StateError,
    SubmitError,
};
pub use events::{Bus, Event, EventKind};
pub use jobs::{
    Behavior, BehaviorRegistry, FailureReason, JobContext, JobId, JobOutcome, JobRequest,
};
pub use policies::{BackoffPolicy, JitterPolicy, TierPolicy};
pub use queue::{ClaimedJob, JobSummary, QueueManager};
pub use shutdown::wait_for_shutdown_signal;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet, SubscriptionId};
pub use workers::{BotState, Pool, PoolBuilder, WorkerRecord, WorkerSummary};
