//! # RegistryKeeper: lifecycle API for the hosting application.
//!
//! The keeper owns every registry component and the scheduler that drives
//! them. Hosts only need four calls:
//!
//! ```text
//! set_service(name, port, group)          identity (ip discovered or configured)
//! init_service(data_id, group, on_config) start scheduler, install recovery,
//!                                         probe, then register → heartbeat → config
//! is_connected()                          cached state for health checks
//! stop()                                  stop jobs, then unregister if connected
//! ```
//!
//! ## Startup
//! ```text
//! init_service
//!   ├─► scheduler.start()
//!   ├─► recovery.install()            (hourly by default)
//!   ├─► record config watch
//!   └─► initial_sync()                (holds the recovery cycle guard)
//!         probe() ── false ─► SyncReport::unreachable()   (recovery takes over)
//!                 └─ true ──► register → heartbeat attach → config sync
//! ```
//!
//! Failures never reach the host as errors: every step is reported in the
//! returned [`SyncReport`] and logged.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use registry_keeper::{BackendError, ConfigCallback, RegistryBackend, RegistryKeeper, ServiceInstance};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl RegistryBackend for Offline {
//!     async fn register(&self, _: &ServiceInstance) -> Result<(), BackendError> { Err(BackendError::connectivity("offline")) }
//!     async fn unregister(&self, _: &ServiceInstance) -> Result<(), BackendError> { Err(BackendError::connectivity("offline")) }
//!     async fn heartbeat(&self, _: &ServiceInstance) -> Result<(), BackendError> { Err(BackendError::connectivity("offline")) }
//!     async fn get_config(&self, _: &str, _: &str) -> Result<String, BackendError> { Err(BackendError::connectivity("offline")) }
//!     async fn watch_config(&self, _: &str, _: &str, _: ConfigCallback) -> Result<(), BackendError> { Err(BackendError::connectivity("offline")) }
//! }
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let keeper = RegistryKeeper::builder(Arc::new(Offline)).build();
//! keeper.set_service("svc", 8080, "g").unwrap();
//!
//! let report = keeper.init_service("cfg", "g", |raw| println!("config: {raw}")).await;
//! assert!(!report.connected);
//! assert!(!keeper.is_connected());
//!
//! keeper.stop().await;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::DropGuard;

use crate::config::Config;
use crate::core::Scheduler;
use crate::error::RegistryError;
use crate::events::{Bus, Event};
use crate::registry::backend::RegistryBackend;
use crate::registry::builder::KeeperBuilder;
use crate::registry::config_sync::{ConfigSync, ConfigWatch};
use crate::registry::connection::{ConnectionState, ConnectionSupervisor};
use crate::registry::heartbeat::HeartbeatLoop;
use crate::registry::instance::{ServiceInstance, local_ip};
use crate::registry::membership::RegistryMembership;
use crate::registry::recovery::{RecoveryState, RecoverySupervisor};
use crate::registry::report::{RecoveryOutcome, SyncReport};

/// Keeps this service registered, alive and configured.
pub struct RegistryKeeper {
    cfg: Config,
    bus: Bus,
    scheduler: Arc<Scheduler>,
    conn: Arc<ConnectionSupervisor>,
    membership: Arc<RegistryMembership>,
    heartbeat: Arc<HeartbeatLoop>,
    config_sync: Arc<ConfigSync>,
    recovery: Arc<RecoverySupervisor>,
    _listener: DropGuard,
}

impl RegistryKeeper {
    /// Starts building a keeper over `backend`.
    pub fn builder(backend: Arc<dyn RegistryBackend>) -> KeeperBuilder {
        KeeperBuilder::new(backend)
    }

    /// Keeper with `cfg` and no subscribers.
    pub fn new(backend: Arc<dyn RegistryBackend>, cfg: Config) -> Self {
        KeeperBuilder::new(backend).with_config(cfg).build()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        scheduler: Arc<Scheduler>,
        conn: Arc<ConnectionSupervisor>,
        membership: Arc<RegistryMembership>,
        heartbeat: Arc<HeartbeatLoop>,
        config_sync: Arc<ConfigSync>,
        recovery: Arc<RecoverySupervisor>,
        listener: DropGuard,
    ) -> Self {
        Self {
            cfg,
            bus,
            scheduler,
            conn,
            membership,
            heartbeat,
            config_sync,
            recovery,
            _listener: listener,
        }
    }

    /// Sets the instance identity; the address comes from `Config::service_ip`
    /// or local discovery.
    pub fn set_service(&self, name: &str, port: u16, group: &str) -> Result<(), RegistryError> {
        let ip = self.cfg.service_ip.unwrap_or_else(local_ip);
        let instance = ServiceInstance::new(name, ip, port, group);
        if let Err(e) = self.membership.set_service(instance.clone()) {
            tracing::warn!(error = %e, "service identity rejected");
            return Err(e);
        }
        tracing::info!(%instance, "service identity set");
        Ok(())
    }

    /// Starts the subsystem. Best-effort: never fails, never blocks longer
    /// than one retry budget per step.
    pub async fn init_service(
        &self,
        data_id: &str,
        group: &str,
        on_config: impl Fn(&str) + Send + Sync + 'static,
    ) -> SyncReport {
        self.scheduler.start().await;
        if let Err(e) = self.recovery.install().await {
            tracing::error!(error = %e, "recovery job not scheduled");
        }
        self.config_sync
            .set_watch(ConfigWatch::new(data_id, group, on_config));

        let report = self.recovery.initial_sync().await;
        if !report.connected {
            tracing::warn!("registry unreachable at startup; recovery will retry");
            return report;
        }
        if report.is_ok() {
            tracing::info!(%report, "registry service initialised");
        } else {
            tracing::warn!(%report, "registry service partially initialised");
        }
        report
    }

    /// Stops all jobs, then unregisters if connected. Never fails.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
        if !self.conn.is_connected() {
            tracing::info!("registry keeper stopped (disconnected; unregister skipped)");
            return;
        }
        match self.membership.unregister().await {
            Ok(_) => tracing::info!("registry keeper stopped"),
            Err(e) => tracing::warn!(error = %e, "unregister failed during shutdown"),
        }
    }

    /// Cached connectivity; never performs I/O.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Receiver notified on every connectivity transition.
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.conn.subscribe()
    }

    /// Raw event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Recovery phase.
    pub fn recovery_state(&self) -> RecoveryState {
        self.recovery.state()
    }

    /// Changes the heartbeat interval; replaces the running job when attached.
    pub async fn set_heartbeat_interval(&self, interval: Duration) -> Result<bool, RegistryError> {
        self.heartbeat.set_interval(interval).await
    }

    /// Last configured heartbeat interval.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat.interval()
    }

    /// Runs one recovery cycle immediately.
    pub async fn recover_now(&self) -> RecoveryOutcome {
        self.recovery.recover_now().await
    }

    /// The identity, if set.
    pub fn service(&self) -> Option<&ServiceInstance> {
        self.membership.instance()
    }

    /// Scheduler driving heartbeat and recovery; hosts may add their own jobs.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}
