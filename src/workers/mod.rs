//! # Worker lifecycle: state machine, actor, pool.
//!
//! One worker = one long-lived actor task bound to one supervised
//! connection, all claiming from the shared queue manager.
//!
//! ## Contents
//! - [`BotState`], [`WorkerRecord`], [`WorkerSummary`] — the per-worker
//!   state machine and its observable record
//! - `BotActor` (internal) — the claim/execute/recover loop
//! - [`Pool`], [`PoolBuilder`] — composition root and admin surface

mod actor;
mod pool;
mod state;

pub use pool::{Pool, PoolBuilder};
pub use state::{BotState, WorkerRecord, WorkerSummary};
