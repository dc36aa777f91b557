//! # ConfigSync: watched configuration delivered to the application.
//!
//! Holds the single requested [`ConfigWatch`] and, on every sync, installs the
//! push watcher first and then fetches and delivers the current content, so the
//! application starts from a definite configuration.
//!
//! ## Sync
//! ```text
//! sync()
//!   ├─ no watch requested        ─► Ok(Skipped(NoConfigWatch))
//!   ├─ disconnected              ─► Ok(Skipped(Disconnected))
//!   ├─ watch_config(cb)          ─► ConfigWatchInstalled     (err ─► StepFailed)
//!   └─ get_config ─► cb(content) ─► ConfigDelivered          (Applied)
//!                 └─ not found   ─► ConfigMissing            (Skipped(ConfigAbsent))
//!
//! result = watch error, else fetch result
//! ```
//!
//! ## Rules
//! - Config failures never change the connection state.
//! - A failed watch install does not stop the fetch: current content is still
//!   delivered, and the step reports the watch error.
//! - The callback may run many times with identical content (every reconnect).
//! - A panicking callback is contained and logged, on both fetch and push paths.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{BackendError, RegistryError, panic_message};
use crate::events::{Event, EventKind};
use crate::policies::with_retry;
use crate::registry::backend::ConfigCallback;
use crate::registry::connection::ConnectionSupervisor;
use crate::registry::report::{SkipReason, StepOutcome, StepResult};

/// A config resource and the callback that receives it.
#[derive(Clone)]
pub struct ConfigWatch {
    /// Config data id.
    pub data_id: String,
    /// Config group.
    pub group: String,
    /// Receives raw content.
    pub callback: ConfigCallback,
}

impl ConfigWatch {
    /// Creates a watch request.
    pub fn new(
        data_id: impl Into<String>,
        group: impl Into<String>,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            data_id: data_id.into(),
            group: group.into(),
            callback: Arc::new(callback),
        }
    }

    /// `data_id@group`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.data_id, self.group)
    }
}

impl fmt::Debug for ConfigWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigWatch")
            .field("data_id", &self.data_id)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// Keeps the application's configuration in sync with the registry.
pub struct ConfigSync {
    conn: Arc<ConnectionSupervisor>,
    watch: Mutex<Option<ConfigWatch>>,
}

impl ConfigSync {
    /// Creates a sync with no watch requested.
    pub fn new(conn: Arc<ConnectionSupervisor>) -> Self {
        Self {
            conn,
            watch: Mutex::new(None),
        }
    }

    /// Records `watch` (replacing any previous one) and syncs it now.
    pub async fn init_config(&self, watch: ConfigWatch) -> StepResult {
        self.set_watch(watch);
        self.sync().await
    }

    /// Records `watch` for the next sync.
    pub fn set_watch(&self, watch: ConfigWatch) {
        *self.watch.lock().unwrap_or_else(PoisonError::into_inner) = Some(watch);
    }

    /// The requested watch, if any.
    pub fn watch(&self) -> Option<ConfigWatch> {
        self.watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs the watcher and delivers the current content.
    pub async fn sync(&self) -> StepResult {
        let Some(watch) = self.watch() else {
            return Ok(StepOutcome::Skipped(SkipReason::NoConfigWatch));
        };
        if !self.conn.is_connected() {
            tracing::debug!(config = %watch.key(), "config sync skipped: disconnected");
            return Ok(StepOutcome::Skipped(SkipReason::Disconnected));
        }
        let key = watch.key();
        let backend = self.conn.backend();
        let (retry, bus) = (self.conn.retry(), self.conn.bus());

        let guarded = guard(key.clone(), Arc::clone(&watch.callback));
        let installed = with_retry(retry, bus, "watch_config", || {
            backend.watch_config(&watch.data_id, &watch.group, Arc::clone(&guarded))
        })
        .await;
        let installed = match installed {
            Ok(()) => {
                bus.publish(Event::new(EventKind::ConfigWatchInstalled).with_target(key.as_str()));
                Ok(())
            }
            Err(e) => Err(self.failed("watch_config", &key, e)),
        };

        let fetched = with_retry(retry, bus, "get_config", || {
            backend.get_config(&watch.data_id, &watch.group)
        })
        .await;
        let delivered = match fetched {
            Ok(content) => {
                guarded(&content);
                tracing::info!(config = %key, bytes = content.len(), "config delivered");
                bus.publish(Event::new(EventKind::ConfigDelivered).with_target(key));
                Ok(StepOutcome::Applied)
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(config = %key, "config does not exist yet");
                bus.publish(Event::new(EventKind::ConfigMissing).with_target(key));
                Ok(StepOutcome::Skipped(SkipReason::ConfigAbsent))
            }
            Err(e) => Err(self.failed("get_config", &key, e)),
        };
        installed.and(delivered)
    }

    fn failed(&self, op: &'static str, key: &str, e: BackendError) -> RegistryError {
        tracing::warn!(op, config = key, error = %e, "config sync failed");
        self.conn.bus().publish(
            Event::new(EventKind::StepFailed)
                .with_op(op)
                .with_target(key)
                .with_reason(e.to_string()),
        );
        e.into()
    }
}

/// Wraps `callback` so a panic is logged instead of unwinding into the caller.
fn guard(key: String, callback: ConfigCallback) -> ConfigCallback {
    Arc::new(move |raw: &str| {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(raw))) {
            tracing::error!(config = %key, info = %panic_message(payload.as_ref()), "config callback panicked");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_callback_contains_panics() {
        let cb = guard("cfg@g".to_string(), Arc::new(|_: &str| panic!("bad parse")));
        cb("x = 1");
    }

    #[test]
    fn watch_key_and_debug() {
        let w = ConfigWatch::new("cfg", "g", |_| {});
        assert_eq!(w.key(), "cfg@g");
        assert!(format!("{w:?}").contains("cfg"));
    }
}
