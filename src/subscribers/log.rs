//! # LogWriter: events as `tracing` records
//!
//! Maps every [`Event`] onto a structured `tracing` record under the
//! `registry_keeper::events` target. Install any `tracing` subscriber
//! (e.g. `tracing-subscriber`'s fmt layer) to see them.
//!
//! ## Levels
//! ```text
//! info   Connected, InstanceRegistered/Unregistered, ConfigDelivered, Recovery*, Scheduler*
//! warn   Disconnected, ProbeFailed, StepFailed, JobFailed, JobTimedOut, ConfigMissing, Subscriber*
//! debug  RetryScheduled, HeartbeatSent, StepSkipped, Job{Added,Replaced,Removed,Fired,Completed}
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "registry_keeper::events";

/// Subscriber that logs events through `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.as_deref().unwrap_or("-");
        let op = e.op.unwrap_or("-");
        let target = e.target.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::SchedulerStarted => tracing::info!(target: TARGET, seq = e.seq, "scheduler started"),
            EventKind::SchedulerStopped => {
                tracing::info!(target: TARGET, seq = e.seq, reason, "scheduler stopped")
            }
            EventKind::JobAdded => tracing::debug!(target: TARGET, seq = e.seq, job, "job added"),
            EventKind::JobReplaced => tracing::debug!(target: TARGET, seq = e.seq, job, "job replaced"),
            EventKind::JobRemoved => tracing::debug!(target: TARGET, seq = e.seq, job, "job removed"),
            EventKind::JobFired => {
                tracing::debug!(target: TARGET, seq = e.seq, job, run = ?e.attempt, "job fired")
            }
            EventKind::JobCompleted => {
                tracing::debug!(target: TARGET, seq = e.seq, job, run = ?e.attempt, "job completed")
            }
            EventKind::JobFailed => {
                tracing::warn!(target: TARGET, seq = e.seq, job, run = ?e.attempt, reason, "job failed")
            }
            EventKind::JobTimedOut => {
                tracing::warn!(target: TARGET, seq = e.seq, job, timeout_ms = ?e.timeout_ms, "job timed out")
            }
            EventKind::Connected => tracing::info!(target: TARGET, seq = e.seq, "registry connected"),
            EventKind::Disconnected => {
                tracing::warn!(target: TARGET, seq = e.seq, op, reason, "registry disconnected")
            }
            EventKind::ProbeFailed => {
                tracing::warn!(target: TARGET, seq = e.seq, reason, "connectivity probe failed")
            }
            EventKind::RetryScheduled => tracing::debug!(
                target: TARGET,
                seq = e.seq,
                op,
                attempt = ?e.attempt,
                delay_ms = ?e.delay_ms,
                reason,
                "retry scheduled"
            ),
            EventKind::InstanceRegistered => {
                tracing::info!(target: TARGET, seq = e.seq, instance = target, "instance registered")
            }
            EventKind::InstanceUnregistered => {
                tracing::info!(target: TARGET, seq = e.seq, instance = target, "instance unregistered")
            }
            EventKind::HeartbeatSent => {
                tracing::debug!(target: TARGET, seq = e.seq, instance = target, "heartbeat sent")
            }
            EventKind::StepSkipped => {
                tracing::debug!(target: TARGET, seq = e.seq, op, reason, "step skipped")
            }
            EventKind::StepFailed => {
                tracing::warn!(target: TARGET, seq = e.seq, op, subject = target, reason, "step failed")
            }
            EventKind::ConfigWatchInstalled => {
                tracing::debug!(target: TARGET, seq = e.seq, config = target, "config watch installed")
            }
            EventKind::ConfigDelivered => {
                tracing::info!(target: TARGET, seq = e.seq, config = target, "config delivered")
            }
            EventKind::ConfigMissing => {
                tracing::warn!(target: TARGET, seq = e.seq, config = target, "config does not exist")
            }
            EventKind::RecoveryStarted => tracing::info!(target: TARGET, seq = e.seq, "recovery started"),
            EventKind::RecoveryCompleted => {
                tracing::info!(target: TARGET, seq = e.seq, reason, "recovery completed")
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: TARGET, seq = e.seq, subscriber = target, reason, "subscriber panicked")
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: TARGET, seq = e.seq, subscriber = target, reason, "subscriber overflow")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
