//! # Events emitted by the scheduler and the registry components.
//!
//! [`EventKind`] classifies events in four groups:
//! - **Scheduler**: lifecycle of the scheduler and of each job run
//! - **Connection**: connectivity transitions and probe outcomes
//! - **Registry steps**: registration, heartbeats, config delivery, retries
//! - **Subscriber**: fan-out problems (overflow, panics)
//!
//! [`Event`] carries the metadata (job id, operation, target, reason, ...).
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases
//! monotonically; use it to restore order across subscribers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use registry_keeper::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_op("register")
//!     .with_attempt(1)
//!     .with_delay(Duration::from_secs(4))
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.op, Some("register"));
//! assert_eq!(ev.delay_ms, Some(4_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Scheduler ===
    /// Scheduler transitioned to running.
    SchedulerStarted,
    /// Scheduler stopped; `reason` lists jobs abandoned after grace, if any.
    SchedulerStopped,
    /// New job id registered (`job`).
    JobAdded,
    /// Existing job id re-registered with a new spec (`job`).
    JobReplaced,
    /// Job removed and its actor joined (`job`).
    JobRemoved,
    /// A run is starting (`job`, `attempt` = run number).
    JobFired,
    /// A run finished without error (`job`, `attempt`).
    JobCompleted,
    /// A run failed or panicked (`job`, `attempt`, `reason`).
    JobFailed,
    /// A run exceeded its timeout (`job`, `attempt`, `timeout_ms`).
    JobTimedOut,

    // === Connection ===
    /// State went Disconnected → Connected.
    Connected,
    /// State went Connected → Disconnected (`op` that observed it, `reason`).
    Disconnected,
    /// A connectivity probe gave up (`reason`).
    ProbeFailed,

    // === Registry steps ===
    /// Backend call failed and will be retried (`op`, `attempt`, `delay_ms`, `reason`).
    RetryScheduled,
    /// Instance registered (`target`).
    InstanceRegistered,
    /// Instance unregistered (`target`).
    InstanceUnregistered,
    /// Liveness signal delivered (`target`).
    HeartbeatSent,
    /// A step was not attempted (`op`, `reason`).
    StepSkipped,
    /// A step failed after retries (`op`, `target`, `reason`).
    StepFailed,
    /// Config push watcher installed (`target` = `data_id@group`).
    ConfigWatchInstalled,
    /// Config content handed to the application callback (`target`).
    ConfigDelivered,
    /// Requested config does not exist on the backend (`target`).
    ConfigMissing,
    /// Recovery cycle began.
    RecoveryStarted,
    /// Recovery cycle finished (`reason` summarises failed steps, if any).
    RecoveryCompleted,

    // === Subscriber ===
    /// Subscriber panicked while handling an event (`target` = subscriber).
    SubscriberPanicked,
    /// Subscriber queue full or closed; event dropped (`target` = subscriber).
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Scheduler job id, if applicable.
    pub job: Option<Arc<str>>,
    /// Backend operation or step name (`register`, `heartbeat`, `get_config`, ...).
    pub op: Option<&'static str>,
    /// Subject of the event: instance, config key or subscriber name.
    pub target: Option<Arc<str>>,
    /// Human-readable reason (errors, summaries).
    pub reason: Option<Arc<str>>,
    /// Run number or retry attempt (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt, in milliseconds.
    pub delay_ms: Option<u32>,
    /// Timeout that was hit, in milliseconds.
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            op: None,
            target: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
        }
    }

    /// Attaches a job id.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches an operation name.
    #[inline]
    pub fn with_op(mut self, op: &'static str) -> Self {
        self.op = Some(op);
        self
    }

    /// Attaches the event subject.
    #[inline]
    pub fn with_target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt/run number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_target(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_target(subscriber)
            .with_reason(info)
    }
}
