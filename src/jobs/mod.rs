//! # Jobs, triggers and specifications.
//!
//! - [`Job`] - trait for async, cancelable scheduled work
//! - [`JobFn`] - closure-backed job
//! - [`JobRef`] - shared handle (`Arc<dyn Job>`)
//! - [`Trigger`] / [`CronSpec`] - interval and cron schedules
//! - [`JobSpec`] - job + trigger + per-run timeout

mod job;
mod job_fn;
mod spec;
mod trigger;

pub use job::{Job, JobRef};
pub use job_fn::JobFn;
pub use spec::JobSpec;
pub use trigger::{CronSpec, Trigger};
