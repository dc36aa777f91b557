//! # registry-keeper
//!
//! **registry-keeper** keeps a network service discoverable by a central
//! service registry through partitions, registry restarts and pushed
//! configuration changes.
//!
//! It registers the service instance, keeps it alive with periodic heartbeats,
//! watches an externally managed configuration, and transparently replays all
//! of that after connectivity comes back. The registry itself is abstracted
//! behind the [`RegistryBackend`] trait.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 host application
//!   set_service / init_service / is_connected / stop
//!                         │
//!                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  RegistryKeeper (lifecycle facade)                                │
//! │  - ConnectionSupervisor (Connected / Disconnected, probe)         │
//! │  - RegistryMembership   (register / unregister / heartbeat)       │
//! │  - ConfigSync           (watch + deliver to callback)             │
//! │  - HeartbeatLoop        (job "registry-heartbeat", every 5s)      │
//! │  - RecoverySupervisor   (job "registry-recovery", hourly)         │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        ▼                              ▼
//! ┌───────────────────┐        ┌──────────────────────────┐
//! │ Scheduler         │        │ Arc<dyn RegistryBackend> │
//! │ one JobActor/id   │        │ (every call: with_retry) │
//! └──────┬────────────┘        └──────────────────────────┘
//!        │ publishes
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                     subscriber listener ──► SubscriberSet
//!                                   ┌─────────┼─────────┐
//!                                   ▼         ▼         ▼
//!                               LogWriter   custom    custom
//! ```
//!
//! ### Recovery
//! ```text
//! any backend call ── connectivity error ──► Disconnected
//!                                                │
//! recovery tick (hourly) ── probe() ok ──────────┘
//!     ├─► register instance
//!     ├─► re-attach heartbeat at the last configured interval
//!     └─► re-install config watch + re-deliver current content
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------|---------------------------------------------|
//! | **Lifecycle**     | Start, stop and query the subsystem.                      | [`RegistryKeeper`], [`SyncReport`]          |
//! | **Backend port**  | Plug in any registry client.                              | [`RegistryBackend`], [`ServiceInstance`]    |
//! | **Scheduling**    | Named interval and cron jobs, replace-by-id.              | [`Scheduler`], [`JobSpec`], [`Trigger`]     |
//! | **Policies**      | Bounded exponential retry for backend calls.              | [`RetryPolicy`], [`with_retry`]             |
//! | **Subscriber API**| Observe connectivity, retries and job runs.               | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors with stable labels.                          | [`BackendError`], [`RegistryError`]         |
//! | **Configuration** | Tunables with defaults, loadable from TOML.               | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber that emits `tracing` records.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use registry_keeper::{
//!     BackendError, Config, ConfigCallback, RegistryBackend, RegistryKeeper, ServiceInstance,
//! };
//!
//! struct Static;
//!
//! #[async_trait]
//! impl RegistryBackend for Static {
//!     async fn register(&self, _: &ServiceInstance) -> Result<(), BackendError> { Ok(()) }
//!     async fn unregister(&self, _: &ServiceInstance) -> Result<(), BackendError> { Ok(()) }
//!     async fn heartbeat(&self, _: &ServiceInstance) -> Result<(), BackendError> { Ok(()) }
//!     async fn get_config(&self, data_id: &str, _: &str) -> Result<String, BackendError> {
//!         match data_id {
//!             "app" => Ok("mode = \"fast\"".to_string()),
//!             other => Err(BackendError::not_found(other)),
//!         }
//!     }
//!     async fn watch_config(&self, _: &str, _: &str, _: ConfigCallback) -> Result<(), BackendError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut cfg = Config::default();
//!     cfg.heartbeat_interval_secs = 10;
//!
//!     let keeper = RegistryKeeper::new(Arc::new(Static), cfg);
//!     keeper.set_service("svc", 8080, "DEFAULT_GROUP").unwrap();
//!
//!     let report = keeper.init_service("app", "DEFAULT_GROUP", |raw| println!("config: {raw}")).await;
//!     assert!(report.is_ok());
//!     assert!(keeper.is_connected());
//!     assert_eq!(keeper.heartbeat_interval(), Duration::from_secs(10));
//!
//!     keeper.stop().await;
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod jobs;
mod policies;
mod registry;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::Scheduler;
pub use error::{BackendError, JobError, RegistryError, ScheduleError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{CronSpec, Job, JobFn, JobRef, JobSpec, Trigger};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy, with_retry, with_retry_if};
pub use registry::{
    ConfigCallback, ConfigSync, ConfigWatch, ConnectionState, ConnectionSupervisor,
    HEARTBEAT_JOB_ID, HeartbeatLoop, KeeperBuilder, RECOVERY_JOB_ID, RecoveryOutcome,
    RecoveryState, RecoverySupervisor, RegistryBackend, RegistryKeeper, RegistryMembership,
    ServiceInstance, SkipReason, StepOutcome, StepResult, SyncReport, local_ip,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the tracing-backed logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
