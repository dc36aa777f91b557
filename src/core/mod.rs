//! Scheduling core.
//!
//! The only public API from this module is [`Scheduler`], which keeps one
//! actor per named job and stops them within a grace period.
//!
//! Internal modules:
//! - [`runner`]: executes one run with timeout, panic containment and event publishing;
//! - [`actor`]: waits on a trigger and fires a single job, never overlapping runs;
//! - [`scheduler`]: owns job handles, replace-by-id, start/stop lifecycle.

mod actor;
mod runner;
mod scheduler;

pub use scheduler::Scheduler;
