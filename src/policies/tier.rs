//! # Pluggable priority mapping.
//!
//! The queue orders jobs by an integer tier (higher = more urgent). How a
//! tier is assigned — flat, favored owners, per-kind weighting — is policy,
//! not core behavior, so [`TierPolicy`] wraps an arbitrary mapping applied
//! once at admission. The default is the identity: the `tier` carried by the
//! request itself.
//!
//! ## Example
//! ```rust
//! use botvisor::{JobRequest, TierPolicy};
//!
//! // Bump a favored owner by one tier.
//! let policy = TierPolicy::new(|job: &JobRequest| {
//!     if &*job.owner == "vip" {
//!         job.tier.saturating_add(1)
//!     } else {
//!         job.tier
//!     }
//! });
//!
//! let job = JobRequest::new("vip", "ping", Vec::new()).with_tier(3);
//! assert_eq!(policy.tier_for(&job), 4);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::jobs::JobRequest;

/// Maps a job request to the effective priority tier used for ordering.
///
/// Applied exactly once, inside `submit`; the queue never re-evaluates it,
/// so a policy change affects only jobs admitted afterwards.
#[derive(Clone)]
pub struct TierPolicy {
    map: Arc<dyn Fn(&JobRequest) -> u8 + Send + Sync>,
}

impl TierPolicy {
    /// Wraps an arbitrary mapping function.
    pub fn new<F>(map: F) -> Self
    where
        F: Fn(&JobRequest) -> u8 + Send + Sync + 'static,
    {
        Self { map: Arc::new(map) }
    }

    /// Identity policy: use the tier supplied by the producer.
    pub fn identity() -> Self {
        Self::new(|job| job.tier)
    }

    /// Computes the effective tier for a request.
    pub fn tier_for(&self, job: &JobRequest) -> u8 {
        (self.map)(job)
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for TierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TierPolicy(..)")
    }
}
