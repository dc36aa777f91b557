//! # Scheduler: named jobs on interval and cron triggers.
//!
//! The scheduler owns one [`JobActor`] per job id and the handle needed to
//! stop it (join handle + cancellation token).
//!
//! ## Architecture
//! ```text
//! add_job(spec) ──► Inner.jobs: HashMap<id, Handle>
//!                      │
//!                      ├─► id present? cancel + join old actor (JobReplaced)
//!                      └─► spawn JobActor::run(child_token)   (JobAdded)
//!
//! stop() ──► cancel every token ──► join within grace ──► abort stragglers
//!                                                     └─► SchedulerStopped
//! ```
//!
//! ## Rules
//! - At most **one** job per id; adding an existing id replaces it.
//! - Adding while stopped is an error ([`ScheduleError::NotRunning`]); the
//!   previous schedule is left untouched.
//! - `start`/`stop` are idempotent and report whether the state changed.
//! - `stop` never fails: actors still running after the grace period are
//!   aborted and listed in the `SchedulerStopped` event.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::actor::JobActor;
use crate::error::ScheduleError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{JobSpec, Trigger};

/// Handle to a running job actor.
struct Handle {
    /// Trigger the actor was started with.
    trigger: Trigger,
    /// Join handle for the actor's execution.
    join: JoinHandle<()>,
    /// Individual cancellation token for this job.
    cancel: CancellationToken,
}

struct Inner {
    running: bool,
    token: CancellationToken,
    jobs: HashMap<String, Handle>,
}

/// Runs named jobs on interval or cron triggers.
pub struct Scheduler {
    bus: Bus,
    grace: Duration,
    inner: Mutex<Inner>,
}

impl Scheduler {
    /// Creates a stopped scheduler with a 5s grace period.
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            grace: Duration::from_secs(5),
            inner: Mutex::new(Inner {
                running: false,
                token: CancellationToken::new(),
                jobs: HashMap::new(),
            }),
        }
    }

    /// Sets how long `stop`, `remove_job` and replacement wait for an actor to exit.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Starts accepting jobs. Returns `false` if already running.
    pub async fn start(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.running {
            return false;
        }
        inner.running = true;
        inner.token = CancellationToken::new();
        drop(inner);

        tracing::debug!("scheduler started");
        self.bus.publish(Event::new(EventKind::SchedulerStarted));
        true
    }

    /// Stops every job and waits up to the grace period for actors to exit.
    ///
    /// Returns `false` if the scheduler was not running.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.running {
            return false;
        }
        inner.running = false;
        inner.token.cancel();
        let handles: Vec<(String, Handle)> = inner.jobs.drain().collect();

        let deadline = time::Instant::now() + self.grace;
        let mut stuck = Vec::new();
        for (id, mut h) in handles {
            h.cancel.cancel();
            if time::timeout_at(deadline, &mut h.join).await.is_err() {
                h.join.abort();
                stuck.push(id);
            }
        }
        drop(inner);

        let mut ev = Event::new(EventKind::SchedulerStopped);
        if stuck.is_empty() {
            tracing::debug!("scheduler stopped");
        } else {
            stuck.sort_unstable();
            tracing::warn!(?stuck, "scheduler stopped; jobs did not exit within grace");
            ev = ev.with_reason(format!("aborted: {}", stuck.join(", ")));
        }
        self.bus.publish(ev);
        true
    }

    /// True between `start` and `stop`.
    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }

    /// Schedules `spec`, replacing any job with the same id.
    pub async fn add_job(&self, spec: JobSpec) -> Result<(), ScheduleError> {
        let id = spec.id().to_string();
        if matches!(spec.trigger(), Trigger::Interval(p) if p.is_zero()) {
            return Err(ScheduleError::ZeroInterval { job: id });
        }

        let mut inner = self.inner.lock().await;
        if !inner.running {
            tracing::warn!(job = %id, "scheduler not running; job not added");
            return Err(ScheduleError::NotRunning { job: id });
        }

        let replaced = match inner.jobs.remove(&id) {
            Some(old) => {
                self.shutdown_actor(&id, old).await;
                true
            }
            None => false,
        };

        let cancel = inner.token.child_token();
        let actor = JobActor::new(
            self.bus.clone(),
            spec.job().clone(),
            spec.trigger().clone(),
            spec.timeout(),
        );
        let join = tokio::spawn(actor.run(cancel.clone()));
        inner.jobs.insert(
            id.clone(),
            Handle {
                trigger: spec.trigger().clone(),
                join,
                cancel,
            },
        );
        drop(inner);

        let kind = if replaced {
            EventKind::JobReplaced
        } else {
            EventKind::JobAdded
        };
        tracing::debug!(job = %id, trigger = %spec.trigger(), replaced, "job scheduled");
        self.bus.publish(Event::new(kind).with_job(id));
        Ok(())
    }

    /// Removes job `id`. Returns `false` if no such job exists.
    pub async fn remove_job(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(handle) = inner.jobs.remove(id) else {
            return false;
        };
        self.shutdown_actor(id, handle).await;
        drop(inner);

        self.bus.publish(Event::new(EventKind::JobRemoved).with_job(id));
        true
    }

    /// True if a job with `id` is scheduled.
    pub async fn has_job(&self, id: &str) -> bool {
        self.inner.lock().await.jobs.contains_key(id)
    }

    /// Sorted ids of all scheduled jobs.
    pub async fn job_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut ids: Vec<String> = inner.jobs.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Trigger of job `id`, if scheduled.
    pub async fn trigger_of(&self, id: &str) -> Option<Trigger> {
        self.inner.lock().await.jobs.get(id).map(|h| h.trigger.clone())
    }

    /// Cancel → join within grace → abort if still alive.
    async fn shutdown_actor(&self, id: &str, mut handle: Handle) {
        handle.cancel.cancel();
        if time::timeout(self.grace, &mut handle.join).await.is_err() {
            tracing::warn!(job = id, "job actor did not exit within grace; aborting");
            handle.join.abort();
        }
    }
}
