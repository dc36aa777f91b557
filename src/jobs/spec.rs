//! # Job specification.
//!
//! [`JobSpec`] bundles a job with its [`Trigger`] and an optional per-run
//! timeout. It is what [`Scheduler::add_job`](crate::Scheduler::add_job) takes.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use registry_keeper::{JobError, JobFn, JobSpec, Trigger};
//!
//! let spec = JobSpec::new(
//!     JobFn::arc("reset-daily-quota", |_ctx: CancellationToken| async { Ok::<_, JobError>(()) }),
//!     Trigger::cron("0 0 * * *").unwrap(),
//! )
//! .with_timeout(Some(Duration::from_secs(60)));
//!
//! assert_eq!(spec.id(), "reset-daily-quota");
//! ```

use std::time::Duration;

use crate::jobs::job::JobRef;
use crate::jobs::trigger::Trigger;

/// Job + trigger + optional per-run timeout.
#[derive(Clone)]
pub struct JobSpec {
    job: JobRef,
    trigger: Trigger,
    timeout: Option<Duration>,
}

impl JobSpec {
    /// Creates a spec without a per-run timeout.
    pub fn new(job: JobRef, trigger: Trigger) -> Self {
        Self {
            job,
            trigger,
            timeout: None,
        }
    }

    /// Returns the job.
    pub fn job(&self) -> &JobRef {
        &self.job
    }

    /// Convenience: returns the job id.
    pub fn id(&self) -> &str {
        self.job.id()
    }

    /// Returns the trigger.
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Returns the per-run timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns a new spec with an updated per-run timeout (`Some(0)` = none).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|d| !d.is_zero());
        self
    }
}
