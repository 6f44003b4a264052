//! # Priority queue and admission management.
//!
//! Two layers, deliberately separated:
//! - [`PriorityQueue`] — the pure ordered container. Total deterministic
//!   order (tier desc, enqueue time asc, sequence asc), no locking, no
//!   knowledge of owners or workers.
//! - [`QueueManager`] — admission policy and claiming on top of it: per-owner
//!   caps, duplicate rejection, cancellation, the suspending `claim_next`,
//!   exactly-once terminal events, and shutdown. All state lives behind one
//!   mutex so admission-check-then-mutate is atomic.
//!
//! ```text
//! producer ──► QueueManager::submit ──► PriorityQueue
//!                                          │
//! worker  ◄── QueueManager::claim_next ◄───┘   (suspends while empty)
//!         ──► QueueManager::report_outcome ──► terminal event, owner slot freed
//! ```

mod manager;
mod priority;

pub use manager::{ClaimedJob, JobSummary, QueueManager};
pub use priority::PriorityQueue;
