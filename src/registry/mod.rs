//! Registry membership and config sync.
//!
//! ## Contents
//! - [`RegistryBackend`] port implemented by the host over its registry client
//! - [`ConnectionSupervisor`] connectivity state machine and probe
//! - [`RegistryMembership`] register / unregister / heartbeat of this instance
//! - [`HeartbeatLoop`] recurring liveness job
//! - [`ConfigSync`] config watch and delivery
//! - [`RecoverySupervisor`] reconnect and replay
//! - [`RegistryKeeper`] lifecycle facade tying them together
//!
//! ## Wiring
//! ```text
//!                    ┌────────────── RegistryKeeper ──────────────┐
//!                    │                                            │
//!   Scheduler ◄──────┤  HeartbeatLoop ─► RegistryMembership ─┐    │
//!      │             │  RecoverySupervisor ─► ConfigSync ────┤    │
//!      │             │                                       ▼    │
//!      │             │                        ConnectionSupervisor│
//!      │             └───────────────────────────────┬────────────┘
//!      ▼                                             ▼
//!  job actors                              Arc<dyn RegistryBackend>
//! ```

mod backend;
mod builder;
mod config_sync;
mod connection;
mod heartbeat;
mod instance;
mod keeper;
mod membership;
mod recovery;
mod report;

pub use backend::{ConfigCallback, RegistryBackend};
pub use builder::KeeperBuilder;
pub use config_sync::{ConfigSync, ConfigWatch};
pub use connection::{ConnectionState, ConnectionSupervisor};
pub use heartbeat::{HEARTBEAT_JOB_ID, HeartbeatLoop};
pub use instance::{ServiceInstance, local_ip};
pub use keeper::RegistryKeeper;
pub use membership::RegistryMembership;
pub use recovery::{RECOVERY_JOB_ID, RecoveryState, RecoverySupervisor};
pub use report::{RecoveryOutcome, SkipReason, StepOutcome, StepResult, SyncReport};
