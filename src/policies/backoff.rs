//! # Backoff policy for reconnect attempts.
//!
//! [`BackoffPolicy`] controls how reconnect delays grow after repeated
//! connection failures. It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for retry `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`, then jitter is applied. Because the base delay is derived purely
//! from the retry count, jitter output never feeds back into subsequent
//! calculations, so delays cannot drift downward over time.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use botvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay(0), Duration::from_secs(1));
//! assert_eq!(backoff.delay(1), Duration::from_secs(2));
//! assert_eq!(backoff.delay(2), Duration::from_secs(4));
//! // 1s × 2^10 = 1024s → capped at max=30s
//! assert_eq!(backoff.delay(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Reconnect backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first reconnect attempt.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to prevent thundering herd.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns the default reconnect strategy:
    /// - `first = 1s`;
    /// - `factor = 2.0` (exponential);
    /// - `max = 30s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            jitter: JitterPolicy::None,
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given retry count (0-indexed).
    ///
    /// The base delay is `first × factor^retry`, clamped to [`BackoffPolicy::max`].
    /// Jitter is applied to the clamped base; the result is never fed back
    /// into subsequent calculations.
    ///
    /// # Notes
    /// - `factor == 1.0` keeps the delay constant at `first` (up to `max`).
    /// - `factor > 1.0` grows delays exponentially up to `max`, after which
    ///   the base stays constant — the sequence is non-decreasing.
    pub fn delay(&self, retry: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = retry.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn retry_zero_returns_first() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
    }

    #[test]
    fn exponential_growth_no_jitter() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };

        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(4), Duration::from_secs(16));
    }

    #[test]
    fn monotonic_until_cap_then_constant() {
        let policy = BackoffPolicy::default();
        let mut prev = Duration::ZERO;
        for retry in 0..20 {
            let d = policy.delay(retry);
            assert!(d >= prev, "retry {retry}: {d:?} < {prev:?}");
            assert!(d <= policy.max);
            prev = d;
        }
        assert_eq!(policy.delay(19), policy.max);
    }

    #[test]
    fn constant_factor() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        };
        for retry in 0..10 {
            assert_eq!(policy.delay(retry), Duration::from_millis(500));
        }
    }

    #[test]
    fn clamped_to_max() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(1),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(policy.delay(10), Duration::from_secs(5));
    }

    #[test]
    fn first_exceeds_max() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(policy.delay(0), Duration::from_secs(5));
    }

    #[test]
    fn full_jitter_stays_under_base() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::Full,
        };

        for retry in 0..5 {
            let base = Duration::from_secs(1 << retry);
            assert!(policy.delay(retry) <= base, "retry {retry}");
        }
    }

    #[test]
    fn equal_jitter_keeps_at_least_half() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(2),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        };

        for retry in 0..4 {
            let base_ms = (2000u64 << retry).min(30_000);
            let d = policy.delay(retry);
            assert!(d >= Duration::from_millis(base_ms / 2), "retry {retry}: {d:?}");
            assert!(d <= Duration::from_millis(base_ms), "retry {retry}: {d:?}");
        }
    }
}
