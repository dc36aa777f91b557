//! # RecoverySupervisor: brings the keeper back after a partition.
//!
//! A low-frequency scheduler job under the fixed id [`RECOVERY_JOB_ID`].
//! While connected it does nothing; once any component flipped the state to
//! `Disconnected`, it probes and, on success, replays the keeper's state.
//!
//! ## States
//! ```text
//!   Idle (connected) ──── backend failure observed ───► Probing (disconnected)
//!        ▲                                                   │
//!        └──── probe ok → register → heartbeat → config ◄────┘
//! ```
//!
//! ## Rules
//! - Replay order is fixed: membership, heartbeat attach, config sync.
//! - Each replay step is attempted even if an earlier one failed; a partial
//!   recovery is corrected by the next cycle.
//! - At most one cycle runs at a time; an overlapping request returns
//!   [`RecoveryOutcome::AlreadyRunning`]. The startup sync holds the same
//!   guard, so a manual recovery cannot replay alongside it.
//! - The job holds a weak reference, so it never keeps the supervisor alive.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::Scheduler;
use crate::error::{JobError, ScheduleError};
use crate::events::{Event, EventKind};
use crate::jobs::{JobFn, JobSpec, Trigger};
use crate::registry::config_sync::ConfigSync;
use crate::registry::connection::ConnectionSupervisor;
use crate::registry::heartbeat::HeartbeatLoop;
use crate::registry::membership::RegistryMembership;
use crate::registry::report::{RecoveryOutcome, SyncReport};

/// Scheduler job id of the recovery probe.
pub const RECOVERY_JOB_ID: &str = "registry-recovery";

/// Phase of the recovery state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryState {
    /// Connected; nothing to recover.
    Idle,
    /// Disconnected; the next tick probes.
    Probing,
}

/// Re-establishes membership, heartbeat and config watch after a reconnect.
pub struct RecoverySupervisor {
    scheduler: Arc<Scheduler>,
    conn: Arc<ConnectionSupervisor>,
    membership: Arc<RegistryMembership>,
    heartbeat: Arc<HeartbeatLoop>,
    config: Arc<ConfigSync>,
    interval: Duration,
    cycle: Mutex<()>,
}

impl RecoverySupervisor {
    /// Creates a supervisor; call [`install`](Self::install) to schedule it.
    pub fn new(
        scheduler: Arc<Scheduler>,
        conn: Arc<ConnectionSupervisor>,
        membership: Arc<RegistryMembership>,
        heartbeat: Arc<HeartbeatLoop>,
        config: Arc<ConfigSync>,
        interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            conn,
            membership,
            heartbeat,
            config,
            interval,
            cycle: Mutex::new(()),
        }
    }

    /// Current phase.
    pub fn state(&self) -> RecoveryState {
        if self.conn.is_connected() {
            RecoveryState::Idle
        } else {
            RecoveryState::Probing
        }
    }

    /// Schedules the recovery job (idempotent: same id replaces).
    pub async fn install(self: &Arc<Self>) -> Result<(), ScheduleError> {
        let me: Weak<Self> = Arc::downgrade(self);
        let job = JobFn::arc(RECOVERY_JOB_ID, move |_ctx: CancellationToken| {
            let me = me.clone();
            async move {
                match me.upgrade() {
                    Some(sup) => {
                        sup.tick().await;
                        Ok(())
                    }
                    None => Err(JobError::Canceled),
                }
            }
        });
        self.scheduler
            .add_job(JobSpec::new(job, Trigger::every(self.interval)))
            .await
    }

    /// One scheduled tick: probes and replays only when disconnected.
    pub async fn tick(&self) -> RecoveryOutcome {
        if self.conn.is_connected() {
            return RecoveryOutcome::Idle;
        }
        self.run_cycle().await
    }

    /// Runs a cycle now regardless of the cached state.
    pub async fn recover_now(&self) -> RecoveryOutcome {
        self.run_cycle().await
    }

    /// Startup probe and replay; waits for a cycle already in progress.
    pub async fn initial_sync(&self) -> SyncReport {
        let _guard = self.cycle.lock().await;
        if !self.conn.probe().await {
            return SyncReport::unreachable();
        }
        self.replay().await
    }

    /// Replays membership, heartbeat and config in that order.
    async fn replay(&self) -> SyncReport {
        let membership = self.membership.register().await;
        let heartbeat = self.heartbeat.attach().await;
        let config = self.config.sync().await;
        SyncReport {
            connected: self.conn.is_connected(),
            membership,
            heartbeat,
            config,
        }
    }

    async fn run_cycle(&self) -> RecoveryOutcome {
        let Ok(_guard) = self.cycle.try_lock() else {
            tracing::debug!("recovery already in progress");
            return RecoveryOutcome::AlreadyRunning;
        };
        let bus = self.conn.bus();
        bus.publish(Event::new(EventKind::RecoveryStarted));

        if !self.conn.probe().await {
            bus.publish(Event::new(EventKind::RecoveryCompleted).with_reason("unreachable"));
            return RecoveryOutcome::Unreachable;
        }

        let report = self.replay().await;
        if report.is_ok() {
            tracing::info!(%report, "registry state recovered");
        } else {
            tracing::warn!(%report, "registry state partially recovered");
        }
        bus.publish(Event::new(EventKind::RecoveryCompleted).with_reason(report.to_string()));
        RecoveryOutcome::Recovered(report)
    }
}
