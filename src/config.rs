//! # Global keeper configuration.
//!
//! [`Config`] centralises every tunable of the registry keeper: heartbeat and
//! recovery cadence, retry policy for backend calls, the health-check resource
//! used by connectivity probes, per-run job timeout and shutdown grace.
//!
//! Config can be built in code (`Config::default()` + field edits) or loaded
//! from TOML with [`Config::from_toml_str`] / [`Config::from_file`]. Every
//! field is optional in TOML; missing fields take their default.
//!
//! ## Sentinel values
//! - `job_timeout_secs = 0` → no per-run timeout
//! - `grace_secs = 0` → stop does not wait for running jobs
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use registry_keeper::Config;
//!
//! let cfg = Config::from_toml_str(r#"
//!     heartbeat_interval_secs = 10
//!     probe_data_id = "ai_model"
//! "#).unwrap();
//!
//! assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(10));
//! assert_eq!(cfg.recovery_interval(), Duration::from_secs(3600));
//! assert_eq!(cfg.retry_policy().max_attempts, 3);
//! ```

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::RegistryError;
use crate::policies::{BackoffPolicy, JitterPolicy, RetryPolicy};

/// Global configuration for the registry keeper.
///
/// ## Field semantics
/// - `heartbeat_interval_secs`: liveness signal cadence while connected
/// - `recovery_interval_secs`: how often the recovery job checks connectivity
/// - `retry_*`: bounded exponential retry applied to every backend call;
///   `retry_jitter` (`"none"`, `"full"`, `"equal"`) spreads a fleet's retries
/// - `probe_data_id` / `probe_group`: config resource read by connectivity probes
/// - `job_timeout_secs`: per-run heartbeat timeout (`0` = none)
/// - `grace_secs`: how long `stop()` waits for running jobs
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `service_ip`: overrides local address discovery
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Heartbeat cadence in seconds.
    pub heartbeat_interval_secs: u64,
    /// Recovery probe cadence in seconds.
    pub recovery_interval_secs: u64,
    /// Total attempts per backend call (including the first one).
    pub retry_max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub retry_first_delay_ms: u64,
    /// Cap on retry delays, in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Multiplicative growth of retry delays.
    pub retry_factor: f64,
    /// Randomisation of retry delays.
    pub retry_jitter: JitterPolicy,
    /// Config data id read by connectivity probes.
    pub probe_data_id: String,
    /// Config group read by connectivity probes.
    pub probe_group: String,
    /// Per-run job timeout in seconds (`0` = no timeout).
    pub job_timeout_secs: u64,
    /// Shutdown grace in seconds.
    pub grace_secs: u64,
    /// Capacity of the event bus.
    pub bus_capacity: usize,
    /// Address advertised to the registry instead of the discovered one.
    pub service_ip: Option<IpAddr>,
}

impl Config {
    /// Parses a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, RegistryError> {
        toml::from_str(raw).map_err(|e| RegistryError::Config {
            error: e.to_string(),
        })
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| RegistryError::Config {
            error: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Heartbeat cadence.
    #[inline]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Recovery probe cadence.
    #[inline]
    pub fn recovery_interval(&self) -> Duration {
        Duration::from_secs(self.recovery_interval_secs)
    }

    /// Returns the per-run job timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → applied to every heartbeat run
    #[inline]
    pub fn job_timeout(&self) -> Option<Duration> {
        match self.job_timeout_secs {
            0 => None,
            n => Some(Duration::from_secs(n)),
        }
    }

    /// Shutdown grace.
    #[inline]
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Builds the retry policy applied to backend calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts.max(1),
            backoff: BackoffPolicy {
                first: Duration::from_millis(self.retry_first_delay_ms),
                max: Duration::from_millis(self.retry_max_delay_ms),
                factor: self.retry_factor,
                jitter: self.retry_jitter,
            },
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - heartbeat every 5s, recovery probe every hour
    /// - 3 attempts per backend call, backoff 4s → 8s → capped at 10s
    /// - probe resource `health_check` in `DEFAULT_GROUP`
    /// - 30s per-run job timeout, 5s shutdown grace
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 5,
            recovery_interval_secs: 3600,
            retry_max_attempts: 3,
            retry_first_delay_ms: 4_000,
            retry_max_delay_ms: 10_000,
            retry_factor: 2.0,
            retry_jitter: JitterPolicy::None,
            probe_data_id: "health_check".to_string(),
            probe_group: "DEFAULT_GROUP".to_string(),
            job_timeout_secs: 30,
            grace_secs: 5,
            bus_capacity: 1024,
            service_ip: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        let retry = cfg.retry_policy();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff.next(0), Duration::from_secs(4));
        assert_eq!(retry.backoff.next(1), Duration::from_secs(8));
        assert_eq!(retry.backoff.next(2), Duration::from_secs(10));
        assert_eq!(cfg.job_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn toml_overrides_and_sentinels() {
        let cfg = Config::from_toml_str(
            r#"
            job_timeout_secs = 0
            retry_max_attempts = 0
            service_ip = "10.1.2.3"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.job_timeout(), None);
        assert_eq!(cfg.retry_policy().max_attempts, 1);
        assert_eq!(cfg.service_ip, Some("10.1.2.3".parse().unwrap()));
        assert_eq!(cfg.heartbeat_interval_secs, 5);
    }

    #[test]
    fn retry_jitter_is_configurable() {
        let cfg = Config::from_toml_str(r#"retry_jitter = "equal""#).unwrap();
        let retry = cfg.retry_policy();
        assert_eq!(retry.backoff.jitter, JitterPolicy::Equal);
        let d = retry.backoff.next(0);
        assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(4), "{d:?}");

        assert_eq!(Config::default().retry_policy().backoff.jitter, JitterPolicy::None);
        assert!(Config::from_toml_str(r#"retry_jitter = "wild""#).is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml_str("heartbeat_interval_secs = \"soon\"").unwrap_err();
        assert_eq!(err.as_label(), "registry_config");
    }
}
