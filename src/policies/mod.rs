//! Retry policies for backend calls.
//!
//! ## Contents
//! - [`RetryPolicy`] attempt budget + delay schedule, applied by [`with_retry`]
//! - [`BackoffPolicy`] how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`] randomisation so a fleet does not retry in lock-step
//!
//! ## Quick wiring
//! ```text
//! Config::retry_policy() ─► RetryPolicy { max_attempts, backoff }
//!      └─► with_retry(policy, bus, "register", || backend.register(..))
//!           - backoff.next(n) between attempts
//! ```
//!
//! ## Defaults
//! - 3 attempts; 4s → 8s → capped at 10s; no jitter.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::{RetryPolicy, with_retry, with_retry_if};
