//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler`, job actors and runner, `ConnectionSupervisor`,
//!   `RegistryMembership`, `ConfigSync`, `RecoverySupervisor`, `with_retry`.
//! - **Consumers**: the keeper's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver from `RegistryKeeper::subscribe_events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
