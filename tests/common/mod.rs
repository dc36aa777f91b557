#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use registry_keeper::{BackendError, Config, ConfigCallback, RegistryBackend, ServiceInstance};

type Key = (String, String);

/// In-memory registry that counts calls and can be switched unreachable.
pub struct FakeBackend {
    online: AtomicBool,
    pub registers: AtomicU32,
    pub unregisters: AtomicU32,
    pub heartbeats: AtomicU32,
    pub config_reads: AtomicU32,
    pub watches: AtomicU32,
    configs: Mutex<HashMap<Key, String>>,
    watchers: Mutex<HashMap<Key, ConfigCallback>>,
    registered: Mutex<HashSet<ServiceInstance>>,
    register_error: Mutex<Option<BackendError>>,
    unregister_error: Mutex<Option<BackendError>>,
    watch_error: Mutex<Option<BackendError>>,
    config_errors: Mutex<HashMap<String, BackendError>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            registers: AtomicU32::new(0),
            unregisters: AtomicU32::new(0),
            heartbeats: AtomicU32::new(0),
            config_reads: AtomicU32::new(0),
            watches: AtomicU32::new(0),
            configs: Mutex::default(),
            watchers: Mutex::default(),
            registered: Mutex::default(),
            register_error: Mutex::default(),
            unregister_error: Mutex::default(),
            watch_error: Mutex::default(),
            config_errors: Mutex::default(),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn put_config(&self, data_id: &str, group: &str, content: &str) {
        self.configs
            .lock()
            .unwrap()
            .insert(key(data_id, group), content.to_string());
    }

    /// Stores content and invokes the installed watcher. Returns whether one was installed.
    pub fn push_config(&self, data_id: &str, group: &str, content: &str) -> bool {
        self.put_config(data_id, group, content);
        let cb = self.watchers.lock().unwrap().get(&key(data_id, group)).cloned();
        match cb {
            Some(cb) => {
                cb(content);
                true
            }
            None => false,
        }
    }

    pub fn has_watcher(&self, data_id: &str, group: &str) -> bool {
        self.watchers.lock().unwrap().contains_key(&key(data_id, group))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.lock().unwrap().iter().any(|i| i.name == name)
    }

    /// Simulates a registry restart: registrations and watchers are lost.
    pub fn forget_all(&self) {
        self.registered.lock().unwrap().clear();
        self.watchers.lock().unwrap().clear();
    }

    /// Drops registrations only; the registry stays reachable.
    pub fn forget_registrations(&self) {
        self.registered.lock().unwrap().clear();
    }

    /// Rejects every register call with `err` until set back to `None`.
    pub fn fail_register(&self, err: Option<BackendError>) {
        *self.register_error.lock().unwrap() = err;
    }

    pub fn fail_watch(&self, err: BackendError) {
        *self.watch_error.lock().unwrap() = Some(err);
    }

    pub fn fail_unregister(&self, err: BackendError) {
        *self.unregister_error.lock().unwrap() = Some(err);
    }

    pub fn fail_config(&self, data_id: &str, err: BackendError) {
        self.config_errors
            .lock()
            .unwrap()
            .insert(data_id.to_string(), err);
    }

    fn reachable(&self) -> Result<(), BackendError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::connectivity("connection refused"))
        }
    }
}

#[async_trait]
impl RegistryBackend for FakeBackend {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), BackendError> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        if let Some(err) = self.register_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.registered.lock().unwrap().insert(instance.clone());
        Ok(())
    }

    async fn unregister(&self, instance: &ServiceInstance) -> Result<(), BackendError> {
        self.unregisters.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        if let Some(err) = self.unregister_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.registered.lock().unwrap().remove(instance);
        Ok(())
    }

    async fn heartbeat(&self, instance: &ServiceInstance) -> Result<(), BackendError> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        if self.registered.lock().unwrap().contains(instance) {
            Ok(())
        } else {
            Err(BackendError::protocol("instance not found"))
        }
    }

    async fn get_config(&self, data_id: &str, group: &str) -> Result<String, BackendError> {
        self.config_reads.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        if let Some(err) = self.config_errors.lock().unwrap().get(data_id).cloned() {
            return Err(err);
        }
        self.configs
            .lock()
            .unwrap()
            .get(&key(data_id, group))
            .cloned()
            .ok_or_else(|| BackendError::connectivity("config data not exist"))
    }

    async fn watch_config(
        &self,
        data_id: &str,
        group: &str,
        callback: ConfigCallback,
    ) -> Result<(), BackendError> {
        self.watches.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        if let Some(err) = self.watch_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.watchers
            .lock()
            .unwrap()
            .insert(key(data_id, group), callback);
        Ok(())
    }
}

fn key(data_id: &str, group: &str) -> Key {
    (data_id.to_string(), group.to_string())
}

pub fn calls(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::SeqCst)
}

/// Default config with a one-minute recovery cadence and a fixed address.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.recovery_interval_secs = 60;
    cfg.service_ip = Some(IpAddr::V4(Ipv4Addr::LOCALHOST));
    cfg
}

/// Config callback that records every delivery.
pub fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |raw: &str| sink.lock().unwrap().push(raw.to_string()))
}
