//! # Example: in_memory
//!
//! Runs the keeper against an in-memory registry that goes offline for a few
//! seconds, then comes back.
//!
//! Shows how to:
//! - Implement [`RegistryBackend`] over a registry client.
//! - Wire [`LogWriter`] and `tracing-subscriber` for structured logs.
//! - Watch connectivity with [`RegistryKeeper::subscribe_connection`].
//! - Schedule a host job on the keeper's scheduler (daily cron).
//!
//! ## Flow
//! ```text
//! set_service ─► init_service ─► heartbeat every 1s
//!      registry offline ─► heartbeat fails ─► Disconnected ─► heartbeats skipped
//!      registry online  ─► recovery tick (3s) ─► register ─► heartbeat ─► config
//!      config pushed    ─► callback
//! stop ─► jobs cancelled ─► unregister
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info,registry_keeper=debug cargo run --example in_memory
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use registry_keeper::{
    BackendError, Config, ConfigCallback, JobError, JobFn, JobSpec, LogWriter, RegistryBackend,
    RegistryKeeper, ServiceInstance, Subscribe, Trigger,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Registry living in process memory; `online` simulates partitions.
#[derive(Default)]
struct InMemoryRegistry {
    online: AtomicBool,
    instances: Mutex<HashSet<ServiceInstance>>,
    configs: Mutex<HashMap<(String, String), String>>,
    watchers: Mutex<HashMap<(String, String), ConfigCallback>>,
    heartbeats: AtomicU64,
}

impl InMemoryRegistry {
    fn reachable(&self) -> Result<(), BackendError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::connectivity("connection refused"))
        }
    }

    /// Stores new content and notifies the watcher, as a config console would.
    fn publish_config(&self, data_id: &str, group: &str, content: &str) {
        let key = (data_id.to_string(), group.to_string());
        self.configs
            .lock()
            .unwrap()
            .insert(key.clone(), content.to_string());
        let watcher = self.watchers.lock().unwrap().get(&key).cloned();
        if let Some(cb) = watcher {
            cb(content);
        }
    }
}

#[async_trait]
impl RegistryBackend for InMemoryRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), BackendError> {
        self.reachable()?;
        self.instances.lock().unwrap().insert(instance.clone());
        Ok(())
    }

    async fn unregister(&self, instance: &ServiceInstance) -> Result<(), BackendError> {
        self.reachable()?;
        self.instances.lock().unwrap().remove(instance);
        Ok(())
    }

    async fn heartbeat(&self, instance: &ServiceInstance) -> Result<(), BackendError> {
        self.reachable()?;
        if !self.instances.lock().unwrap().contains(instance) {
            return Err(BackendError::protocol(format!("unknown instance {instance}")));
        }
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_config(&self, data_id: &str, group: &str) -> Result<String, BackendError> {
        self.reachable()?;
        self.configs
            .lock()
            .unwrap()
            .get(&(data_id.to_string(), group.to_string()))
            .cloned()
            .ok_or_else(|| BackendError::connectivity("config data not exist"))
    }

    async fn watch_config(
        &self,
        data_id: &str,
        group: &str,
        callback: ConfigCallback,
    ) -> Result<(), BackendError> {
        self.reachable()?;
        self.watchers
            .lock()
            .unwrap()
            .insert((data_id.to_string(), group.to_string()), callback);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = Arc::new(InMemoryRegistry::default());
    registry.online.store(true, Ordering::SeqCst);
    registry.publish_config("ai_model", "DEFAULT_GROUP", "model = \"small\"");

    let cfg = Config::from_toml_str(
        r#"
        heartbeat_interval_secs = 1
        recovery_interval_secs = 3
        retry_max_attempts = 2
        retry_first_delay_ms = 200
        retry_max_delay_ms = 500
        "#,
    )?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let keeper = RegistryKeeper::builder(registry.clone())
        .with_config(cfg)
        .with_subscribers(subs)
        .build();

    let mut conn = keeper.subscribe_connection();
    tokio::spawn(async move {
        while conn.changed().await.is_ok() {
            println!("[demo] connection is now {:?}", *conn.borrow_and_update());
        }
    });

    keeper.set_service("content-service", 8080, "DEFAULT_GROUP")?;
    let report = keeper
        .init_service("ai_model", "DEFAULT_GROUP", |raw| {
            println!("[demo] config received: {raw}");
        })
        .await;
    println!("[demo] startup: {report}");

    let reset: JobSpec = JobSpec::new(
        JobFn::arc("reset-daily-quota", |_ctx: CancellationToken| async {
            println!("[demo] daily quota reset");
            Ok::<_, JobError>(())
        }),
        Trigger::cron("0 0 * * *")?,
    );
    keeper.scheduler().add_job(reset).await?;
    println!("[demo] jobs: {:?}", keeper.scheduler().job_ids().await);

    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("[demo] registry going offline");
    registry.online.store(false, Ordering::SeqCst);
    registry.instances.lock().unwrap().clear();

    tokio::time::sleep(Duration::from_secs(4)).await;
    println!("[demo] connected while offline: {}", keeper.is_connected());
    println!("[demo] registry back online");
    registry.online.store(true, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(5)).await;
    println!("[demo] connected after recovery: {}", keeper.is_connected());
    registry.publish_config("ai_model", "DEFAULT_GROUP", "model = \"large\"");

    keeper.set_heartbeat_interval(Duration::from_millis(500)).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    keeper.stop().await;
    println!(
        "[demo] heartbeats delivered: {}, instances left: {}",
        registry.heartbeats.load(Ordering::SeqCst),
        registry.instances.lock().unwrap().len()
    );
    Ok(())
}
