//! Reconnect and priority policies.
//!
//! This module groups the knobs that control **how long** a worker waits
//! between reconnect attempts and **how** a job's priority tier is derived.
//!
//! ## Contents
//! - [`BackoffPolicy`] — how reconnect delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`] — randomization strategy to avoid thundering herd
//! - [`TierPolicy`] — pluggable mapping from a job request to its effective tier
//!
//! ## Quick wiring
//! ```text
//! Config { backoff: BackoffPolicy, max_retries } ─► ConnectionSupervisor
//!     delay(n) = first × factor^n, clamped to max, then jitter
//!
//! PoolBuilder::with_tier_policy(TierPolicy) ─► QueueManager::submit
//!     effective tier decided once, at admission
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=1s, factor=2.0 (exponential), max=30s, jitter=None.
//! - `TierPolicy::default()` → identity: the request's own `tier` field.

mod backoff;
mod jitter;
mod tier;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use tier::TierPolicy;
