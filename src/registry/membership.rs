//! # RegistryMembership: this instance in the registry.
//!
//! Registers, unregisters and heartbeats the [`ServiceInstance`] set once via
//! [`RegistryMembership::set_service`].
//!
//! ## Step guard
//! ```text
//! step() ─► identity set & complete? ── no ──► Ok(Skipped(ServiceNotSet))
//!        ─► connected?               ── no ──► Ok(Skipped(Disconnected))
//!        ─► with_retry(backend call) ── ok ──► Ok(Applied)
//!                                    └─ err ─► flip Disconnected
//!                                              StepFailed, Err(Backend)
//! ```
//!
//! Register and unregister flip the state only on connectivity failures. A
//! failed heartbeat always flips it: a registry that rejects the liveness
//! signal (e.g. "instance not found" after a restart) has lost this instance,
//! and the next recovery cycle registers it again.
//!
//! Skips are not retried here; recovery replays registration after a reconnect.

use std::sync::{Arc, OnceLock};

use crate::error::{BackendError, RegistryError};
use crate::events::{Event, EventKind};
use crate::policies::with_retry;
use crate::registry::connection::ConnectionSupervisor;
use crate::registry::instance::ServiceInstance;
use crate::registry::report::{SkipReason, StepOutcome, StepResult};

/// Membership of this process in the registry.
pub struct RegistryMembership {
    conn: Arc<ConnectionSupervisor>,
    instance: OnceLock<ServiceInstance>,
}

impl RegistryMembership {
    /// Creates membership without an identity.
    pub fn new(conn: Arc<ConnectionSupervisor>) -> Self {
        Self {
            conn,
            instance: OnceLock::new(),
        }
    }

    /// Sets the instance identity. It cannot change afterwards.
    ///
    /// Setting the same identity again is a no-op.
    pub fn set_service(&self, instance: ServiceInstance) -> Result<(), RegistryError> {
        if !instance.is_complete() {
            return Err(RegistryError::Config {
                error: format!("incomplete service identity: {instance}"),
            });
        }
        let current = self.instance.get_or_init(|| instance.clone());
        if *current != instance {
            return Err(RegistryError::Config {
                error: format!("service already set to {current}"),
            });
        }
        Ok(())
    }

    /// The identity, if set.
    pub fn instance(&self) -> Option<&ServiceInstance> {
        self.instance.get()
    }

    /// Registers the instance.
    pub async fn register(&self) -> StepResult {
        let inst = match self.guard("register") {
            Ok(inst) => inst,
            Err(skip) => return Ok(skip),
        };
        let res = with_retry(self.conn.retry(), self.conn.bus(), "register", || {
            self.conn.backend().register(inst)
        })
        .await;
        self.finish("register", EventKind::InstanceRegistered, inst, res, false)
    }

    /// Unregisters the instance. Failures are reported, never raised.
    pub async fn unregister(&self) -> StepResult {
        let inst = match self.guard("unregister") {
            Ok(inst) => inst,
            Err(skip) => return Ok(skip),
        };
        let res = with_retry(self.conn.retry(), self.conn.bus(), "unregister", || {
            self.conn.backend().unregister(inst)
        })
        .await;
        self.finish("unregister", EventKind::InstanceUnregistered, inst, res, false)
    }

    /// Sends one liveness signal; skipped without a backend call while disconnected.
    pub async fn heartbeat(&self) -> StepResult {
        let inst = match self.guard("heartbeat") {
            Ok(inst) => inst,
            Err(skip) => return Ok(skip),
        };
        let res = with_retry(self.conn.retry(), self.conn.bus(), "heartbeat", || {
            self.conn.backend().heartbeat(inst)
        })
        .await;
        self.finish("heartbeat", EventKind::HeartbeatSent, inst, res, true)
    }

    fn guard(&self, op: &'static str) -> Result<&ServiceInstance, StepOutcome> {
        let reason = match self.instance.get() {
            None => SkipReason::ServiceNotSet,
            Some(_) if !self.conn.is_connected() => SkipReason::Disconnected,
            Some(inst) => return Ok(inst),
        };
        tracing::debug!(op, reason = reason.as_label(), "step skipped");
        self.conn.bus().publish(
            Event::new(EventKind::StepSkipped)
                .with_op(op)
                .with_reason(reason.as_label()),
        );
        Err(StepOutcome::Skipped(reason))
    }

    fn finish(
        &self,
        op: &'static str,
        done: EventKind,
        inst: &ServiceInstance,
        res: Result<(), BackendError>,
        membership_lost: bool,
    ) -> StepResult {
        match res {
            Ok(()) => {
                self.conn
                    .bus()
                    .publish(Event::new(done).with_target(inst.to_string()));
                Ok(StepOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!(op, instance = %inst, error = %e, "registry step failed");
                if membership_lost {
                    self.conn.mark_disconnected(op, &e.to_string());
                } else {
                    self.conn.observe_failure(op, &e);
                }
                self.conn.bus().publish(
                    Event::new(EventKind::StepFailed)
                        .with_op(op)
                        .with_target(inst.to_string())
                        .with_reason(e.to_string()),
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::Bus;
    use crate::registry::backend::{ConfigCallback, RegistryBackend};
    use async_trait::async_trait;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counting {
        registers: AtomicU32,
        heartbeats: AtomicU32,
    }

    #[async_trait]
    impl RegistryBackend for Counting {
        async fn register(&self, _: &ServiceInstance) -> Result<(), BackendError> {
            self.registers.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn unregister(&self, _: &ServiceInstance) -> Result<(), BackendError> {
            Err(BackendError::protocol("instance unknown"))
        }
        async fn heartbeat(&self, _: &ServiceInstance) -> Result<(), BackendError> {
            if self.heartbeats.fetch_add(1, Ordering::SeqCst) >= 1 {
                return Err(BackendError::protocol("instance not found"));
            }
            Ok(())
        }
        async fn get_config(&self, _: &str, _: &str) -> Result<String, BackendError> {
            Ok(String::new())
        }
        async fn watch_config(&self, _: &str, _: &str, _: ConfigCallback) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn svc() -> ServiceInstance {
        ServiceInstance::new("svc", IpAddr::V4(Ipv4Addr::LOCALHOST), 8080, "g")
    }

    fn setup() -> (Arc<Counting>, Arc<ConnectionSupervisor>, RegistryMembership) {
        let backend = Arc::new(Counting::default());
        let conn = Arc::new(ConnectionSupervisor::new(
            backend.clone(),
            Bus::default(),
            &Config::default(),
        ));
        let m = RegistryMembership::new(conn.clone());
        (backend, conn, m)
    }

    #[tokio::test]
    async fn steps_are_skipped_until_identity_and_connection() {
        let (backend, conn, m) = setup();
        assert_eq!(
            m.register().await,
            Ok(StepOutcome::Skipped(SkipReason::ServiceNotSet))
        );

        m.set_service(svc()).unwrap();
        assert_eq!(
            m.heartbeat().await,
            Ok(StepOutcome::Skipped(SkipReason::Disconnected))
        );
        assert_eq!(backend.heartbeats.load(Ordering::SeqCst), 0);

        conn.mark_connected();
        assert_eq!(m.register().await, Ok(StepOutcome::Applied));
        assert_eq!(m.heartbeat().await, Ok(StepOutcome::Applied));
        assert_eq!(backend.registers.load(Ordering::SeqCst), 1);
        assert_eq!(backend.heartbeats.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identity_is_immutable() {
        let (_, _, m) = setup();
        m.set_service(svc()).unwrap();
        m.set_service(svc()).unwrap();
        let other = ServiceInstance::new("other", IpAddr::V4(Ipv4Addr::LOCALHOST), 9090, "g");
        assert_eq!(m.set_service(other).unwrap_err().as_label(), "registry_config");
        assert_eq!(m.instance(), Some(&svc()));
    }

    #[tokio::test]
    async fn protocol_failure_does_not_flip_connectivity() {
        let (_, conn, m) = setup();
        m.set_service(svc()).unwrap();
        conn.mark_connected();

        let err = m.unregister().await.unwrap_err();
        assert_eq!(err.as_label(), "backend_protocol");
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn rejected_heartbeat_disconnects() {
        let (backend, conn, m) = setup();
        m.set_service(svc()).unwrap();
        conn.mark_connected();

        assert_eq!(m.heartbeat().await, Ok(StepOutcome::Applied));
        let err = m.heartbeat().await.unwrap_err();
        assert_eq!(err.as_label(), "backend_protocol");
        assert!(!conn.is_connected());
        // Protocol errors are not retried.
        assert_eq!(backend.heartbeats.load(Ordering::SeqCst), 2);
    }
}
