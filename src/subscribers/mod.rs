//! # Event subscribers.
//!
//! The [`Subscribe`] trait and the [`SubscriberSet`] fan-out that feeds
//! subscribers from the keeper's [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//!   Scheduler / registry steps ── publish(Event) ──► Bus
//!                                                     │
//!                                     keeper listener (subscribe)
//!                                                     ▼
//!                                              SubscriberSet::emit
//!                                     ┌───────────────┼──────────────┐
//!                                     ▼               ▼              ▼
//!                                 LogWriter        Metrics        Custom
//! ```
//!
//! - [`LogWriter`] (feature `logging`) turns events into `tracing` records.

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
