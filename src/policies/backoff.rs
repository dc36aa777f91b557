//! # Backoff between retries of a backend call.
//!
//! [`BackoffPolicy`] maps a zero-based retry number to a delay:
//! `first × factor^n`, clamped to `max`, then passed through the configured
//! [`JitterPolicy`]. The base is recomputed from `n` on every call, so a short
//! jittered delay never drags later delays down with it.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use registry_keeper::{BackoffPolicy, JitterPolicy};
//!
//! // Registry default: 4s, 8s, then capped at 10s.
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(4),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(4));
//! assert_eq!(backoff.next(1), Duration::from_secs(8));
//! assert_eq!(backoff.next(2), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Exponential backoff bounded by a minimum (`first`) and maximum (`max`) delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth factor per retry (`1.0` = constant).
    pub factor: f64,
    /// Randomisation applied after clamping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// 4s first delay, doubling, capped at 10s, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(4),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait before retry number `retry` (0-indexed).
    ///
    /// Non-finite or negative intermediate values (huge exponents, bogus
    /// factors) collapse to `max`.
    pub fn next(&self, retry: u32) -> Duration {
        let exp = retry.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        };

        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(first_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn grows_then_caps() {
        let policy = exp(250, 1_500);
        assert_eq!(policy.next(0), Duration::from_millis(250));
        assert_eq!(policy.next(1), Duration::from_millis(500));
        assert_eq!(policy.next(2), Duration::from_millis(1_000));
        assert_eq!(policy.next(3), Duration::from_millis(1_500));
        assert_eq!(policy.next(9), Duration::from_millis(1_500));
    }

    #[test]
    fn first_above_max_is_clamped() {
        assert_eq!(exp(20_000, 10_000).next(0), Duration::from_secs(10));
    }

    #[test]
    fn overflowing_exponent_yields_max() {
        assert_eq!(exp(100, 10_000).next(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_base() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..exp(4_000, 10_000)
        };
        for retry in 0..20 {
            let d = policy.next(retry);
            assert!(d >= Duration::from_secs(2), "retry {retry}: {d:?}");
            assert!(d <= Duration::from_secs(10), "retry {retry}: {d:?}");
        }
    }
}
