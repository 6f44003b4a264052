//! # Job data model and behaviors.
//!
//! This module provides the job-side types:
//! - [`JobRequest`], [`JobId`] — the unit of requested work
//! - [`JobOutcome`], [`FailureReason`] — terminal result of a claimed job
//! - [`Behavior`], [`BehaviorRegistry`] — per-kind execution, selected at
//!   dispatch time
//! - [`JobContext`] — cancellation and progress plumbing handed to behaviors

mod behavior;
mod outcome;
mod request;

pub use behavior::{Behavior, BehaviorRegistry, JobContext};
pub use outcome::{FailureReason, JobOutcome};
pub use request::{JobId, JobRequest};
