//! # Jitter policy for reconnect delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that a burst of
//! workers losing the same upstream does not retry in lock-step.
//!
//! - [`JitterPolicy::None`] — no randomization, predictable delays
//! - [`JitterPolicy::Full`] — random delay in [0, delay]
//! - [`JitterPolicy::Equal`] — delay/2 + random[0, delay/2] (balanced)
//! - [`JitterPolicy::Decorrelated`] — grows from the previous delay, capped

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of reconnect delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay.
    ///
    /// Predictable timing; the right choice for tests and single workers.
    #[default]
    None,

    /// Full jitter: random delay in [0, delay].
    ///
    /// Maximum load spreading; can shrink the delay to near zero.
    Full,

    /// Equal jitter: delay/2 + random[0, delay/2].
    ///
    /// Preserves ~75% of the original delay on average (recommended when
    /// many workers share one endpoint).
    Equal,

    /// Decorrelated jitter: random[base, prev × 3], capped at max.
    ///
    /// Requires context (base, prev, max) via
    /// [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    ///
    /// For `Decorrelated` this returns the input unchanged; use
    /// [`apply_decorrelated`](Self::apply_decorrelated), which takes the
    /// extra context it needs.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => self.full_jitter(delay),
            JitterPolicy::Equal => self.equal_jitter(delay),
            JitterPolicy::Decorrelated => delay,
        }
    }

    /// Applies decorrelated jitter with full context.
    ///
    /// Falls back to `apply(prev)` when called on another variant.
    pub fn apply_decorrelated(&self, base: Duration, prev: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(prev);
        }

        let mut rng = rand::rng();
        let base_ms = base.as_millis() as u64;
        let prev_ms = prev.as_millis() as u64;
        let max_ms = max.as_millis() as u64;

        let upper_bound = (prev_ms.saturating_mul(3)).min(max_ms);
        let clamped_upper = upper_bound.max(base_ms);

        if base_ms >= clamped_upper {
            return base;
        }

        let jittered_ms = rng.random_range(base_ms..=clamped_upper);
        Duration::from_millis(jittered_ms)
    }

    /// Full jitter: random[0, delay]
    fn full_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::rng();
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(0..=ms))
    }

    /// Equal jitter: delay/2 + random[0, delay/2]
    fn equal_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::rng();
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        let half = ms / 2;
        let jitter = if half == 0 {
            0
        } else {
            rng.random_range(0..=half)
        };
        Duration::from_millis(half + jitter)
    }
}
