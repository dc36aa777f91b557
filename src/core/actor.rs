//! # JobActor: fires one job on its trigger.
//!
//! One actor per scheduled job id. It waits for the trigger, runs the job
//! via [`run_once`], and waits again until its token is cancelled.
//!
//! ## Event flow
//! ```text
//! [wait trigger] → JobFired → run_once() → JobCompleted / JobFailed (+ JobTimedOut)
//!       ▲                                          │
//!       └──────────────────────────────────────────┘
//! ```
//!
//! ## Architecture
//! ```text
//! JobSpec ──► Scheduler::add_job ──► JobActor::run()
//!
//! loop {
//!   ├─► select { token.cancelled() → break, ticker.tick() }
//!   ├─► publish JobFired
//!   └─► run_once()  (awaited: runs never overlap)
//! }
//! ```
//!
//! ## Rules
//! - Runs of one job are **sequential**; a slow run delays the next tick
//! - Interval triggers first fire **one period after** the actor starts
//! - Missed interval ticks are **not** replayed in a burst
//! - Run counter is **monotonic** for the actor's lifetime

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::runner::run_once,
    events::{Bus, Event, EventKind},
    jobs::{CronSpec, JobRef, Trigger},
};

/// Fires a single job according to its trigger.
pub struct JobActor {
    /// Job to execute.
    pub job: JobRef,
    /// When to fire.
    pub trigger: Trigger,
    /// Optional per-run timeout.
    pub timeout: Option<Duration>,
    /// Event bus for run lifecycle events.
    pub bus: Bus,
}

impl JobActor {
    /// Creates a new actor.
    pub fn new(bus: Bus, job: JobRef, trigger: Trigger, timeout: Option<Duration>) -> Self {
        Self {
            job,
            trigger,
            timeout,
            bus,
        }
    }

    /// Runs until `token` is cancelled or the trigger can no longer fire.
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = Ticker::new(&self.trigger);
        let mut runs: u32 = 0;

        loop {
            select! {
                _ = token.cancelled() => break,
                fired = ticker.tick() => {
                    if !fired {
                        tracing::debug!(job = self.job.id(), "trigger exhausted");
                        break;
                    }
                }
            }

            runs = runs.saturating_add(1);
            self.bus.publish(
                Event::new(EventKind::JobFired)
                    .with_job(self.job.id())
                    .with_attempt(runs),
            );
            let _ = run_once(self.job.as_ref(), &token, self.timeout, runs, &self.bus).await;

            if token.is_cancelled() {
                break;
            }
        }
    }
}

/// Trigger-specific wait state.
enum Ticker {
    Every(time::Interval),
    /// Cron schedule and the last minute it fired for.
    Cron(CronSpec, Option<DateTime<Utc>>),
}

impl Ticker {
    fn new(trigger: &Trigger) -> Self {
        match trigger {
            Trigger::Interval(period) => {
                let mut iv = time::interval_at(time::Instant::now() + *period, *period);
                iv.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
                Ticker::Every(iv)
            }
            Trigger::Cron(spec) => Ticker::Cron(*spec, None),
        }
    }

    /// Waits for the next fire; `false` if there is none.
    async fn tick(&mut self) -> bool {
        match self {
            Ticker::Every(iv) => {
                iv.tick().await;
                true
            }
            Ticker::Cron(spec, last) => {
                let now = Utc::now();
                // Never fire the same minute twice if the timer woke early.
                let from = last.map_or(now, |l| l.max(now));
                let Some(next) = spec.next_after(from) else {
                    return false;
                };
                time::sleep((next - now).to_std().unwrap_or(Duration::ZERO)).await;
                *last = Some(next);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::jobs::JobFn;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting(id: &'static str, counter: Arc<AtomicU32>) -> JobRef {
        JobFn::arc(id, move |_ctx: CancellationToken| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, JobError>(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn interval_first_fire_is_one_period_later() {
        let runs = Arc::new(AtomicU32::new(0));
        let actor = JobActor::new(
            Bus::default(),
            counting("tick", runs.clone()),
            Trigger::every(Duration::from_secs(5)),
            None,
        );
        let token = CancellationToken::new();
        let join = tokio::spawn(actor.run(token.clone()));

        time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        token.cancel();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_runs_do_not_overlap() {
        let active = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));
        let (a, p) = (active.clone(), peak.clone());
        let job: JobRef = JobFn::arc("slow", move |_ctx: CancellationToken| {
            let (a, p) = (a.clone(), p.clone());
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                time::sleep(Duration::from_secs(7)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, JobError>(())
            }
        });
        let actor = JobActor::new(Bus::default(), job, Trigger::every(Duration::from_secs(2)), None);
        let token = CancellationToken::new();
        let join = tokio::spawn(actor.run(token.clone()));

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);

        token.cancel();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_running_job() {
        let job: JobRef = JobFn::arc("stuck", |_ctx: CancellationToken| async {
            std::future::pending::<()>().await;
            Ok::<_, JobError>(())
        });
        let actor = JobActor::new(Bus::default(), job, Trigger::every(Duration::from_secs(1)), None);
        let token = CancellationToken::new();
        let join = tokio::spawn(actor.run(token.clone()));

        time::sleep(Duration::from_secs(2)).await;
        token.cancel();
        time::timeout(Duration::from_secs(1), join).await.unwrap().unwrap();
    }
}
