//! # Registry backend port.
//!
//! [`RegistryBackend`] is everything the keeper needs from a service registry:
//! instance membership, liveness signals and config read/watch. Implement it
//! over your registry client; the keeper never talks to the network otherwise.
//!
//! ## Contract
//! - Any call may fail with [`BackendError::Connectivity`]; the keeper retries
//!   per its [`RetryPolicy`](crate::RetryPolicy) and flips to disconnected.
//! - `get_config` reports a missing resource with [`BackendError::NotFound`]
//!   (or a message containing "config data not exist"); the keeper treats it
//!   as proof the backend is reachable.
//! - `watch_config` keeps **one** watcher per `(data_id, group)`; installing a
//!   new one replaces the previous callback.
//! - `register` is idempotent for an already registered instance.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::registry::instance::ServiceInstance;

/// Application callback receiving raw config content (fetched or pushed).
pub type ConfigCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Remote service registry as seen by the keeper.
#[async_trait]
pub trait RegistryBackend: Send + Sync + 'static {
    /// Adds `instance` to the registry.
    async fn register(&self, instance: &ServiceInstance) -> Result<(), BackendError>;

    /// Removes `instance` from the registry.
    async fn unregister(&self, instance: &ServiceInstance) -> Result<(), BackendError>;

    /// Sends a liveness signal for `instance`.
    async fn heartbeat(&self, instance: &ServiceInstance) -> Result<(), BackendError>;

    /// Reads the current content of a config resource.
    async fn get_config(&self, data_id: &str, group: &str) -> Result<String, BackendError>;

    /// Installs a push watcher invoking `callback` on every change.
    async fn watch_config(
        &self,
        data_id: &str,
        group: &str,
        callback: ConfigCallback,
    ) -> Result<(), BackendError>;
}
