//! # Typed outcomes of registry steps.
//!
//! Every startup and recovery step returns a [`StepResult`] instead of
//! swallowing errors; the keeper aggregates them in a [`SyncReport`] and logs
//! it at the boundary.
//!
//! ```text
//! Ok(Applied)              step talked to the backend and succeeded
//! Ok(Skipped(reason))      step was not attempted (or had nothing to deliver)
//! Err(RegistryError)       step failed after retries
//! ```

use std::fmt;

use crate::error::RegistryError;

/// Why a step did not run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Connection state is `Disconnected`.
    Disconnected,
    /// `set_service` was not called.
    ServiceNotSet,
    /// No config watch was requested yet.
    NoConfigWatch,
    /// The watched config does not exist on the backend yet.
    ConfigAbsent,
}

impl SkipReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SkipReason::Disconnected => "disconnected",
            SkipReason::ServiceNotSet => "service_not_set",
            SkipReason::NoConfigWatch => "no_config_watch",
            SkipReason::ConfigAbsent => "config_absent",
        }
    }
}

/// Successful outcome of a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step executed against the backend.
    Applied,
    /// Step was skipped.
    Skipped(SkipReason),
}

/// Result of one membership, heartbeat or config step.
pub type StepResult = Result<StepOutcome, RegistryError>;

/// Aggregated outcome of a startup or recovery cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncReport {
    /// Connection state at the end of the cycle.
    pub connected: bool,
    /// Instance registration.
    pub membership: StepResult,
    /// Heartbeat job attachment.
    pub heartbeat: StepResult,
    /// Config watch + delivery.
    pub config: StepResult,
}

impl SyncReport {
    /// Report for a cycle that never reached the backend.
    pub fn unreachable() -> Self {
        let skipped = Ok(StepOutcome::Skipped(SkipReason::Disconnected));
        Self {
            connected: false,
            membership: skipped.clone(),
            heartbeat: skipped.clone(),
            config: skipped,
        }
    }

    /// Steps that failed, by name.
    pub fn failures(&self) -> Vec<(&'static str, &RegistryError)> {
        self.steps()
            .into_iter()
            .filter_map(|(name, res)| res.as_ref().err().map(|e| (name, e)))
            .collect()
    }

    /// True if no step failed.
    pub fn is_ok(&self) -> bool {
        self.steps().iter().all(|(_, res)| res.is_ok())
    }

    fn steps(&self) -> [(&'static str, &StepResult); 3] {
        [
            ("membership", &self.membership),
            ("heartbeat", &self.heartbeat),
            ("config", &self.config),
        ]
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connected={}", self.connected)?;
        for (name, res) in self.steps() {
            match res {
                Ok(StepOutcome::Applied) => write!(f, " {name}=applied")?,
                Ok(StepOutcome::Skipped(r)) => write!(f, " {name}=skipped({})", r.as_label())?,
                Err(e) => write!(f, " {name}=failed({})", e.as_label())?,
            }
        }
        Ok(())
    }
}

/// Outcome of one recovery tick.
#[derive(Clone, Debug, PartialEq)]
pub enum RecoveryOutcome {
    /// Already connected; nothing to do.
    Idle,
    /// Another recovery cycle is in progress.
    AlreadyRunning,
    /// Probe failed; still disconnected.
    Unreachable,
    /// Probe succeeded and state was replayed.
    Recovered(SyncReport),
}
