//! # Job abstraction.
//!
//! A [`Job`] is the unit the [`Scheduler`](crate::Scheduler) fires on every
//! trigger tick. It has a stable [`id`](Job::id) (the scheduler's key) and an async
//! [`run`](Job::run) that receives a [`CancellationToken`].
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use registry_keeper::{Job, JobError};
//!
//! struct Cleanup;
//!
//! #[async_trait]
//! impl Job for Cleanup {
//!     fn id(&self) -> &str { "cleanup" }
//!
//!     async fn run(&self, ctx: CancellationToken) -> Result<(), JobError> {
//!         if ctx.is_cancelled() {
//!             return Err(JobError::Canceled);
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// Shared handle to a job.
pub type JobRef = Arc<dyn Job>;

/// Asynchronous, cancelable unit of scheduled work.
///
/// Runs of one job never overlap. A failed, timed-out or panicking run is
/// reported and the job stays scheduled.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Stable identifier; re-adding a job with the same id replaces it.
    fn id(&self) -> &str;

    /// Executes one run.
    ///
    /// `ctx` is cancelled when the job is removed or replaced, or the scheduler stops.
    async fn run(&self, ctx: CancellationToken) -> Result<(), JobError>;
}
