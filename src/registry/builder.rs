use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::Scheduler,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{
    backend::RegistryBackend, config_sync::ConfigSync, connection::ConnectionSupervisor,
    heartbeat::HeartbeatLoop, keeper::RegistryKeeper, membership::RegistryMembership,
    recovery::RecoverySupervisor,
};

/// Builder for a [`RegistryKeeper`].
pub struct KeeperBuilder {
    backend: Arc<dyn RegistryBackend>,
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl KeeperBuilder {
    /// Creates a builder with the default configuration and no subscribers.
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self {
            backend,
            cfg: Config::default(),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive keeper events (connectivity, retries, job runs)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Wires every component and returns the keeper.
    ///
    /// Must be called inside a tokio runtime when subscribers are set.
    pub fn build(self) -> RegistryKeeper {
        let cfg = self.cfg;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let scheduler = Arc::new(Scheduler::new(bus.clone()).with_grace(cfg.grace()));
        let conn = Arc::new(ConnectionSupervisor::new(self.backend, bus.clone(), &cfg));
        let membership = Arc::new(RegistryMembership::new(Arc::clone(&conn)));
        let heartbeat = Arc::new(HeartbeatLoop::new(
            Arc::clone(&scheduler),
            Arc::clone(&conn),
            Arc::clone(&membership),
            cfg.heartbeat_interval(),
            cfg.job_timeout(),
        ));
        let config_sync = Arc::new(ConfigSync::new(Arc::clone(&conn)));
        let recovery = Arc::new(RecoverySupervisor::new(
            Arc::clone(&scheduler),
            Arc::clone(&conn),
            Arc::clone(&membership),
            Arc::clone(&heartbeat),
            Arc::clone(&config_sync),
            cfg.recovery_interval(),
        ));

        let listener = CancellationToken::new();
        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            spawn_subscriber_listener(&bus, subs, listener.clone());
        }

        RegistryKeeper::new_internal(
            cfg,
            bus,
            scheduler,
            conn,
            membership,
            heartbeat,
            config_sync,
            recovery,
            listener.drop_guard(),
        )
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
fn spawn_subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged; events lost");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        subs.shutdown().await;
    });
}
