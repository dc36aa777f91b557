//! # Bounded retry for backend calls.
//!
//! [`RetryPolicy`] is a plain value (attempt budget + [`BackoffPolicy`]);
//! [`with_retry`] is the combinator that applies it to any async backend call.
//! Every registry operation goes through it, so no single call can block
//! longer than the sum of its backoff delays plus the backend's own timeouts.
//!
//! ## Flow
//! ```text
//! attempt = 1
//! loop {
//!   call() ─► Ok(v)                               ─► return Ok(v)
//!          └► Err(e) not retryable (not found...) ─► return Err(e)
//!          └► Err(e), attempt == max_attempts     ─► return Err(e)
//!          └► Err(e) ─► publish RetryScheduled ─► sleep(backoff.next(attempt-1)) ─► attempt += 1
//! }
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use registry_keeper::{with_retry, BackendError, BackoffPolicy, Bus, RetryPolicy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy = RetryPolicy {
//!     max_attempts: 3,
//!     backoff: BackoffPolicy { first: Duration::from_millis(1), max: Duration::from_millis(2), ..Default::default() },
//! };
//! let calls = AtomicU32::new(0);
//! let res = with_retry(&policy, &Bus::default(), "get_config", || async {
//!     calls.fetch_add(1, Ordering::SeqCst);
//!     Err::<(), _>(BackendError::connectivity("down"))
//! })
//! .await;
//!
//! assert!(res.is_err());
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! # }
//! ```

use std::future::Future;

use crate::error::BackendError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;

/// Attempt budget and delay schedule for one backend call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (`0` behaves as `1`).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// Three attempts with the default exponential backoff (4s, 8s, cap 10s).
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Runs `call` under `policy`, publishing a `RetryScheduled` event before each retry.
///
/// Only [`BackendError::is_retryable`] failures are retried; absence reports and
/// protocol errors return immediately. The last error is returned when the
/// attempt budget is exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    bus: &Bus,
    op: &'static str,
    call: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    with_retry_if(policy, bus, op, BackendError::is_retryable, call).await
}

/// Like [`with_retry`], but `retryable` decides which failures get another attempt.
pub async fn with_retry_if<T, F, Fut, R>(
    policy: &RetryPolicy,
    bus: &Bus,
    op: &'static str,
    retryable: R,
    mut call: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
    R: Fn(&BackendError) -> bool,
{
    let budget = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err = match call().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if !retryable(&err) || attempt >= budget {
            return Err(err);
        }

        let delay = policy.backoff.next(attempt - 1);
        tracing::debug!(op, attempt, ?delay, error = %err, "backend call failed; retrying");
        bus.publish(
            Event::new(EventKind::RetryScheduled)
                .with_op(op)
                .with_attempt(attempt)
                .with_delay(delay)
                .with_reason(err.to_string()),
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let res = with_retry(&RetryPolicy::default(), &Bus::default(), "register", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(BackendError::connectivity("refused"))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(res, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_backoff_between_attempts() {
        let started = tokio::time::Instant::now();
        let res: Result<(), _> = with_retry(&RetryPolicy::default(), &Bus::default(), "heartbeat", || async {
            Err(BackendError::connectivity("timeout"))
        })
        .await;
        assert!(res.is_err());
        // 4s + 8s between the three attempts.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(12), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(13), "{elapsed:?}");
    }

    #[tokio::test]
    async fn not_found_is_returned_immediately() {
        let calls = AtomicU32::new(0);
        let res: Result<String, _> = with_retry(&RetryPolicy::default(), &Bus::default(), "get_config", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::not_found("cfg@g"))
        })
        .await;
        assert!(res.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_predicate_retries_protocol_errors() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = with_retry_if(
            &RetryPolicy::default(),
            &Bus::default(),
            "probe",
            |e: &BackendError| !e.is_not_found(),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::protocol("bad gateway"))
            },
        )
        .await;
        assert_eq!(res.unwrap_err().as_label(), "backend_protocol");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_retry_events() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let _ = with_retry(&policy, &bus, "unregister", || async {
            Err::<(), _>(BackendError::connectivity("down"))
        })
        .await;

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::RetryScheduled);
        assert_eq!(ev.op, Some("unregister"));
        assert_eq!(ev.attempt, Some(1));
        assert!(rx.try_recv().is_err());
    }
}
