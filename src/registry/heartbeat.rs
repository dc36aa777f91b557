//! # HeartbeatLoop: the recurring liveness job.
//!
//! One scheduler job under the fixed id [`HEARTBEAT_JOB_ID`]. Each run calls
//! [`RegistryMembership::heartbeat`], which is skipped without a backend call
//! while disconnected and flips the state on connectivity failures. The job
//! never removes itself, so it resumes on its own once recovery reconnects.
//!
//! ## Rules
//! - Attaching is guarded by connectivity; recovery re-attaches after a probe.
//! - Attaching again replaces the job (same id): never two heartbeats in flight.
//! - The interval is remembered even while detached, so a reconnect re-applies
//!   the last configured value.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::Scheduler;
use crate::error::{JobError, RegistryError, ScheduleError};
use crate::jobs::{JobFn, JobSpec, Trigger};
use crate::registry::connection::ConnectionSupervisor;
use crate::registry::membership::RegistryMembership;
use crate::registry::report::{SkipReason, StepOutcome, StepResult};

/// Scheduler job id of the heartbeat.
pub const HEARTBEAT_JOB_ID: &str = "registry-heartbeat";

/// Recurring liveness signal.
pub struct HeartbeatLoop {
    scheduler: Arc<Scheduler>,
    conn: Arc<ConnectionSupervisor>,
    membership: Arc<RegistryMembership>,
    interval_ms: AtomicU64,
    timeout: Option<Duration>,
}

impl HeartbeatLoop {
    /// Creates a detached heartbeat loop.
    pub fn new(
        scheduler: Arc<Scheduler>,
        conn: Arc<ConnectionSupervisor>,
        membership: Arc<RegistryMembership>,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            scheduler,
            conn,
            membership,
            interval_ms: AtomicU64::new(duration_ms(interval)),
            timeout,
        }
    }

    /// Last configured interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// True if the heartbeat job is scheduled.
    pub async fn is_attached(&self) -> bool {
        self.scheduler.has_job(HEARTBEAT_JOB_ID).await
    }

    /// Schedules the heartbeat at the remembered interval, replacing any previous one.
    pub async fn attach(&self) -> StepResult {
        if !self.conn.is_connected() {
            tracing::debug!("heartbeat not attached: disconnected");
            return Ok(StepOutcome::Skipped(SkipReason::Disconnected));
        }
        self.scheduler.add_job(self.spec()).await?;
        tracing::debug!(interval = ?self.interval(), "heartbeat attached");
        Ok(StepOutcome::Applied)
    }

    /// Removes the heartbeat job. Returns `false` if it was not scheduled.
    pub async fn detach(&self) -> bool {
        self.scheduler.remove_job(HEARTBEAT_JOB_ID).await
    }

    /// Changes the interval; re-attaches under the same id when attached.
    ///
    /// Returns whether the running job was replaced.
    pub async fn set_interval(&self, interval: Duration) -> Result<bool, RegistryError> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval {
                job: HEARTBEAT_JOB_ID.to_string(),
            }
            .into());
        }
        self.interval_ms.store(duration_ms(interval), Ordering::Relaxed);
        if !self.is_attached().await {
            return Ok(false);
        }
        self.scheduler.add_job(self.spec()).await?;
        Ok(true)
    }

    fn spec(&self) -> JobSpec {
        let membership = Arc::clone(&self.membership);
        let job = JobFn::arc(HEARTBEAT_JOB_ID, move |_ctx: CancellationToken| {
            let membership = Arc::clone(&membership);
            async move {
                membership.heartbeat().await.map(|_| ()).map_err(JobError::from)
            }
        });
        JobSpec::new(job, Trigger::every(self.interval())).with_timeout(self.timeout)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
