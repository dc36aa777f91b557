//! # ConnectionSupervisor: the connectivity state machine.
//!
//! Owns the single authoritative [`ConnectionState`]. Every registry step
//! reads it before touching the backend, and any step that observes a
//! connectivity failure flips it to `Disconnected`.
//!
//! ## State machine
//! ```text
//!              probe() ok / "not found"
//!   Disconnected ───────────────────────► Connected
//!        ▲                                    │
//!        └────────────────────────────────────┘
//!          connectivity error in probe, register or
//!          unregister; any heartbeat failure
//! ```
//!
//! ## Rules
//! - `is_connected()` is a cached read; it never performs I/O.
//! - Writes go through `watch::Sender::send_if_modified`, one writer at a
//!   time; only real transitions publish `Connected` / `Disconnected`.
//! - A probe reads the health-check config resource under the retry policy;
//!   a "not found" answer proves reachability. Every other failure, protocol
//!   errors included, uses the full attempt budget before the probe gives up.
//! - A rejected heartbeat means the registry no longer holds this instance,
//!   so it disconnects even when the backend answered.

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::Config;
use crate::error::BackendError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RetryPolicy, with_retry_if};
use crate::registry::backend::RegistryBackend;

/// Connectivity to the registry backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Backend not reachable (initial state).
    Disconnected,
    /// Last probe or backend call succeeded.
    Connected,
}

/// Owns the connection state and probes the backend.
pub struct ConnectionSupervisor {
    backend: Arc<dyn RegistryBackend>,
    bus: Bus,
    retry: RetryPolicy,
    probe_data_id: String,
    probe_group: String,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor in the `Disconnected` state.
    pub fn new(backend: Arc<dyn RegistryBackend>, bus: Bus, cfg: &Config) -> Self {
        Self {
            backend,
            bus,
            retry: cfg.retry_policy(),
            probe_data_id: cfg.probe_data_id.clone(),
            probe_group: cfg.probe_group.clone(),
            state: watch::Sender::new(ConnectionState::Disconnected),
        }
    }

    /// Cached connectivity; never blocks on the network.
    #[inline]
    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Backend shared by all registry steps.
    pub fn backend(&self) -> &Arc<dyn RegistryBackend> {
        &self.backend
    }

    /// Retry policy applied to backend calls.
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Sets `Connected`. Returns `true` on a transition.
    pub fn mark_connected(&self) -> bool {
        let flipped = self.transition(ConnectionState::Connected);
        if flipped {
            tracing::info!("registry backend connected");
            self.bus.publish(Event::new(EventKind::Connected));
        }
        flipped
    }

    /// Sets `Disconnected`. Returns `true` on a transition.
    pub fn mark_disconnected(&self, op: &'static str, reason: &str) -> bool {
        let flipped = self.transition(ConnectionState::Disconnected);
        if flipped {
            tracing::warn!(op, reason, "registry backend disconnected");
            self.bus.publish(
                Event::new(EventKind::Disconnected)
                    .with_op(op)
                    .with_reason(reason),
            );
        }
        flipped
    }

    /// Flips to `Disconnected` if `err` is a connectivity failure.
    pub fn observe_failure(&self, op: &'static str, err: &BackendError) {
        if err.is_retryable() {
            self.mark_disconnected(op, &err.to_string());
        }
    }

    /// Probes the backend with a harmless config read.
    ///
    /// Returns `true` (and sets `Connected`) on success or on a "not found"
    /// answer; otherwise sets `Disconnected` and returns `false`.
    pub async fn probe(&self) -> bool {
        let res = with_retry_if(
            &self.retry,
            &self.bus,
            "probe",
            |e: &BackendError| !e.is_not_found(),
            || self.backend.get_config(&self.probe_data_id, &self.probe_group),
        )
        .await;

        match res {
            Ok(_) => {
                self.mark_connected();
                true
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(resource = %self.probe_data_id, "probe resource absent; backend reachable");
                self.mark_connected();
                true
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "connectivity probe failed");
                self.bus
                    .publish(Event::new(EventKind::ProbeFailed).with_reason(reason.as_str()));
                self.mark_disconnected("probe", &reason);
                false
            }
        }
    }

    fn transition(&self, to: ConnectionState) -> bool {
        self.state.send_if_modified(|cur| {
            if *cur == to {
                return false;
            }
            *cur = to;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::backend::ConfigCallback;
    use crate::registry::instance::ServiceInstance;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Backend whose `get_config` always returns the same error (or content).
    struct Canned {
        answer: Result<String, BackendError>,
        calls: AtomicU32,
    }

    impl Canned {
        fn new(answer: Result<String, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl RegistryBackend for Canned {
        async fn register(&self, _: &ServiceInstance) -> Result<(), BackendError> {
            Ok(())
        }
        async fn unregister(&self, _: &ServiceInstance) -> Result<(), BackendError> {
            Ok(())
        }
        async fn heartbeat(&self, _: &ServiceInstance) -> Result<(), BackendError> {
            Ok(())
        }
        async fn get_config(&self, _: &str, _: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
        async fn watch_config(&self, _: &str, _: &str, _: ConfigCallback) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn config_data_not_exist_counts_as_reachable() {
        let backend = Canned::new(Err(BackendError::connectivity("config data not exist")));
        let sup = ConnectionSupervisor::new(backend.clone(), Bus::default(), &Config::default());

        assert!(sup.probe().await);
        assert!(sup.is_connected());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_backend_exhausts_retries() {
        let backend = Canned::new(Err(BackendError::connectivity("connection refused")));
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let sup = ConnectionSupervisor::new(backend.clone(), bus, &Config::default());

        assert!(!sup.probe().await);
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::ProbeFailed));
        // Already disconnected: no transition event.
        assert!(!kinds.contains(&EventKind::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn protocol_failure_uses_the_whole_budget() {
        let backend = Canned::new(Err(BackendError::protocol("bad gateway")));
        let sup = ConnectionSupervisor::new(backend.clone(), Bus::default(), &Config::default());

        assert!(!sup.probe().await);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sup.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn transitions_notify_watchers_once() {
        let backend = Canned::new(Ok("{}".to_string()));
        let sup = ConnectionSupervisor::new(backend, Bus::default(), &Config::default());
        let mut rx = sup.subscribe();

        assert!(sup.mark_connected());
        assert!(!sup.mark_connected());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);

        sup.observe_failure("heartbeat", &BackendError::not_found("x"));
        assert!(sup.is_connected());
        sup.observe_failure("heartbeat", &BackendError::connectivity("reset"));
        assert!(!sup.is_connected());
    }
}
