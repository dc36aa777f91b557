//! Error types used by the registry keeper and its scheduler.
//!
//! This module defines four error enums:
//!
//! - [`BackendError`]: failures reported by a [`RegistryBackend`](crate::RegistryBackend).
//! - [`ScheduleError`]: invalid triggers or calls against a stopped scheduler.
//! - [`RegistryError`]: failures of membership, heartbeat and config-sync steps.
//! - [`JobError`]: failures of a single scheduled job run.
//!
//! All types provide `as_label` (stable snake_case) for logging/metrics.

use std::time::Duration;

use thiserror::Error;

/// Markers the registry backend uses to report an absent resource in free text.
const NOT_FOUND_MARKERS: [&str; 2] = ["config data not exist", "not found"];

/// # Errors produced by a registry backend call.
///
/// Backends may classify failures precisely (`NotFound`) or report everything as
/// `Connectivity`/`Protocol` with a descriptive message; [`BackendError::is_not_found`]
/// recognises both forms.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend unreachable, timed out or refused the connection.
    #[error("backend unreachable: {error}")]
    Connectivity {
        /// The underlying error message.
        error: String,
    },

    /// The requested config (data id, group) does not exist yet.
    #[error("resource not found: {resource}")]
    NotFound {
        /// Identifier of the missing resource.
        resource: String,
    },

    /// Backend answered, but the answer was rejected or malformed.
    #[error("protocol error: {error}")]
    Protocol {
        /// The underlying error message.
        error: String,
    },
}

impl BackendError {
    /// Convenience constructor for [`BackendError::Connectivity`].
    pub fn connectivity(error: impl Into<String>) -> Self {
        BackendError::Connectivity {
            error: error.into(),
        }
    }

    /// Convenience constructor for [`BackendError::NotFound`].
    pub fn not_found(resource: impl Into<String>) -> Self {
        BackendError::NotFound {
            resource: resource.into(),
        }
    }

    /// Convenience constructor for [`BackendError::Protocol`].
    pub fn protocol(error: impl Into<String>) -> Self {
        BackendError::Protocol {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use registry_keeper::BackendError;
    ///
    /// let err = BackendError::connectivity("connection refused");
    /// assert_eq!(err.as_label(), "backend_connectivity");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::Connectivity { .. } => "backend_connectivity",
            BackendError::NotFound { .. } => "backend_not_found",
            BackendError::Protocol { .. } => "backend_protocol",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BackendError::Connectivity { error } => format!("unreachable: {error}"),
            BackendError::NotFound { resource } => format!("not found: {resource}"),
            BackendError::Protocol { error } => format!("protocol: {error}"),
        }
    }

    /// True when the failure proves the backend is reachable but the resource is absent.
    ///
    /// # Example
    /// ```
    /// use registry_keeper::BackendError;
    ///
    /// assert!(BackendError::not_found("cfg@g").is_not_found());
    /// assert!(BackendError::protocol("config data not exist").is_not_found());
    /// assert!(!BackendError::connectivity("timed out").is_not_found());
    /// ```
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::NotFound { .. } => true,
            BackendError::Connectivity { error } | BackendError::Protocol { error } => {
                let lowered = error.to_ascii_lowercase();
                NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m))
            }
        }
    }

    /// Indicates whether retrying the same call may succeed.
    ///
    /// Only connectivity failures that are not absence reports are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Connectivity { .. }) && !self.is_not_found()
    }
}

/// # Errors produced by the job scheduler.
///
/// Configuration errors: fatal to the specific call, never retried automatically.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Cron expression has the wrong shape or out-of-range fields.
    #[error("invalid cron expression {expr:?}: {reason}")]
    InvalidCron {
        /// Expression as supplied.
        expr: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Interval triggers must be strictly positive.
    #[error("interval trigger for job {job:?} must be greater than zero")]
    ZeroInterval {
        /// Job identifier.
        job: String,
    },

    /// Jobs can only be added while the scheduler is running.
    #[error("scheduler is not running; job {job:?} rejected")]
    NotRunning {
        /// Job identifier.
        job: String,
    },
}

impl ScheduleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleError::InvalidCron { .. } => "schedule_invalid_cron",
            ScheduleError::ZeroInterval { .. } => "schedule_zero_interval",
            ScheduleError::NotRunning { .. } => "schedule_not_running",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ScheduleError::InvalidCron { expr, reason } => format!("cron {expr:?}: {reason}"),
            ScheduleError::ZeroInterval { job } => format!("zero interval: {job}"),
            ScheduleError::NotRunning { job } => format!("scheduler stopped: {job}"),
        }
    }
}

/// # Errors produced by registry steps (membership, heartbeat, config sync).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// `set_service` was never called (or left a field empty).
    #[error("service identity is not set")]
    ServiceNotSet,

    /// The step requires a connected backend.
    #[error("registry backend is disconnected")]
    Disconnected,

    /// The backend call failed after retries.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A job could not be scheduled.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {error}")]
    Config {
        /// The underlying error message.
        error: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use registry_keeper::{BackendError, RegistryError};
    ///
    /// let err = RegistryError::from(BackendError::connectivity("down"));
    /// assert_eq!(err.as_label(), "backend_connectivity");
    /// assert_eq!(RegistryError::ServiceNotSet.as_label(), "registry_service_not_set");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::ServiceNotSet => "registry_service_not_set",
            RegistryError::Disconnected => "registry_disconnected",
            RegistryError::Backend(e) => e.as_label(),
            RegistryError::Schedule(e) => e.as_label(),
            RegistryError::Config { .. } => "registry_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegistryError::ServiceNotSet => "service identity is not set".to_string(),
            RegistryError::Disconnected => "backend disconnected".to_string(),
            RegistryError::Backend(e) => e.as_message(),
            RegistryError::Schedule(e) => e.as_message(),
            RegistryError::Config { error } => format!("config: {error}"),
        }
    }

    /// True when the error means the backend cannot currently be reached.
    pub fn is_connectivity(&self) -> bool {
        match self {
            RegistryError::Backend(e) => {
                !e.is_not_found() && !matches!(e, BackendError::Protocol { .. })
            }
            RegistryError::Disconnected => true,
            _ => false,
        }
    }
}

/// # Errors produced by a single job run.
///
/// None of these stop the job: the scheduler records the failure and waits for
/// the next fire time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Run exceeded its timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// Run reported a failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Run panicked; the panic was contained at the actor boundary.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Run observed cancellation and exited early.
    #[error("context cancelled")]
    Canceled,
}

impl JobError {
    /// Convenience constructor for [`JobError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Timeout { .. } => "job_timeout",
            JobError::Fail { .. } => "job_failed",
            JobError::Panicked { .. } => "job_panicked",
            JobError::Canceled => "job_canceled",
        }
    }
}

impl From<RegistryError> for JobError {
    fn from(e: RegistryError) -> Self {
        JobError::fail(e.to_string())
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_recognised_from_message_text() {
        let err = BackendError::connectivity("server said: config data not exist");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn connectivity_is_retryable() {
        assert!(BackendError::connectivity("connection reset").is_retryable());
        assert!(!BackendError::protocol("bad json").is_retryable());
        assert!(!BackendError::not_found("cfg").is_retryable());
    }

    #[test]
    fn registry_error_classifies_connectivity() {
        assert!(RegistryError::from(BackendError::connectivity("down")).is_connectivity());
        assert!(!RegistryError::from(BackendError::not_found("x")).is_connectivity());
        assert!(!RegistryError::ServiceNotSet.is_connectivity());
    }
}
