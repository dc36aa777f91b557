//! # Run a single job execution.
//!
//! Executes one run of a [`Job`] with optional timeout, contains panics, and
//! publishes the terminal event to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:      job.run() → Ok(())          → JobCompleted
//! Failure:      job.run() → Err(Fail)       → JobFailed
//! Panic:        job.run() panics            → JobFailed (Panicked)
//! Timeout:      deadline hit → cancel child → JobTimedOut → JobFailed (Timeout)
//! Cancellation: parent token cancelled      → run future dropped, no event
//! ```
//!
//! ## Rules
//! - Derives a **child token** per run; cancelling it never affects the parent.
//! - Cancellation of the parent **drops** the in-flight run immediately.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{JobError, panic_message},
    events::{Bus, Event, EventKind},
    jobs::Job,
};

/// Executes run number `run` of `job`, publishing its outcome to `bus`.
pub async fn run_once(
    job: &dyn Job,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    run: u32,
    bus: &Bus,
) -> Result<(), JobError> {
    let child = parent.child_token();

    let attempt = async {
        let guarded = AssertUnwindSafe(job.run(child.clone())).catch_unwind();
        let outcome = match timeout {
            Some(dur) => match time::timeout(dur, guarded).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => {
                    child.cancel();
                    bus.publish(
                        Event::new(EventKind::JobTimedOut)
                            .with_job(job.id())
                            .with_attempt(run)
                            .with_timeout(dur),
                    );
                    return Err(JobError::Timeout { timeout: dur });
                }
            },
            None => guarded.await,
        };
        outcome.unwrap_or_else(|payload| {
            Err(JobError::Panicked {
                info: panic_message(payload.as_ref()),
            })
        })
    };

    let res = tokio::select! {
        res = attempt => res,
        _ = parent.cancelled() => return Err(JobError::Canceled),
    };

    match &res {
        Ok(()) => bus.publish(
            Event::new(EventKind::JobCompleted)
                .with_job(job.id())
                .with_attempt(run),
        ),
        Err(JobError::Canceled) => {}
        Err(e) => {
            tracing::warn!(job = job.id(), run, error = %e, "job run failed");
            bus.publish(
                Event::new(EventKind::JobFailed)
                    .with_job(job.id())
                    .with_attempt(run)
                    .with_reason(e.to_string()),
            );
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobFn, JobRef};

    #[tokio::test]
    async fn panic_is_contained_and_reported() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let job: JobRef = JobFn::arc("boom", |_ctx: CancellationToken| async {
            panic!("kaboom");
            #[allow(unreachable_code)]
            Ok::<_, JobError>(())
        });

        let res = run_once(job.as_ref(), &CancellationToken::new(), None, 1, &bus).await;
        assert_eq!(
            res,
            Err(JobError::Panicked {
                info: "kaboom".to_string()
            })
        );
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::JobFailed);
        assert_eq!(ev.job.as_deref(), Some("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_the_run() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let job: JobRef = JobFn::arc("slow", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(JobError::Canceled)
        });

        let res = run_once(job.as_ref(), &CancellationToken::new(), Some(Duration::from_secs(1)), 3, &bus).await;
        assert!(matches!(res, Err(JobError::Timeout { .. })));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::JobTimedOut);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::JobFailed);
    }

    #[tokio::test]
    async fn parent_cancellation_drops_run_silently() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let parent = CancellationToken::new();
        parent.cancel();
        let job: JobRef = JobFn::arc("idle", |_ctx: CancellationToken| async {
            std::future::pending::<()>().await;
            Ok::<_, JobError>(())
        });

        let res = run_once(job.as_ref(), &parent, None, 1, &bus).await;
        assert_eq!(res, Err(JobError::Canceled));
        assert!(rx.try_recv().is_err());
    }
}
