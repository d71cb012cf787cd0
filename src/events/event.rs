//! # Runtime events emitted by runners, the timer and the executor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Runner events**: runner registration, rejected submissions, task panics
//! - **Timer events**: scheduling, cancellation and completion of timed work
//! - **Lifecycle events**: timer start/stop and the two-phase shutdown
//!
//! The [`Event`] struct carries the metadata: timestamp, runner tag,
//! repeated-task id, delay and a free-form reason.
//!
//! ## Ordering guarantees
//! Every event published through a [`Bus`](crate::events::Bus) is stamped with a
//! sequence number that increases monotonically per bus. Use `seq` to restore
//! the exact order when events are observed from several receivers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tasklane::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RepeatedScheduled)
//!     .with_repeated_id(7)
//!     .with_delay(Duration::from_millis(500));
//!
//! assert_eq!(ev.kind, EventKind::RepeatedScheduled);
//! assert_eq!(ev.repeated_id, Some(7));
//! assert_eq!(ev.delay_ms, Some(500));
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::tasks::RepeatedTaskId;

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Runner events ===
    /// A runner was registered.
    ///
    /// Sets:
    /// - `runner`: the tag actually used
    /// - `reason`: the requested tag, when it had to be replaced
    RunnerAdded,

    /// A submission was refused (unknown runner or unavailable pool).
    ///
    /// Sets:
    /// - `runner`: requested tag
    /// - `reason`: error label
    TaskRejected,

    /// A task panicked on a pool worker; the worker kept running.
    ///
    /// Sets:
    /// - `runner`: pool name
    /// - `reason`: panic message
    TaskPanicked,

    // === Timer events ===
    /// The timer dispatch thread was started.
    TimerStarted,

    /// The timer was stopped and its thread joined.
    TimerStopped,

    /// A one-shot delayed task was queued.
    ///
    /// Sets:
    /// - `delay_ms`: requested delay
    DelayedScheduled,

    /// A repeated task was registered.
    ///
    /// Sets:
    /// - `repeated_id`: assigned id
    /// - `delay_ms`: firing interval
    RepeatedScheduled,

    /// A repeated task was removed from the active set by the caller.
    ///
    /// Sets:
    /// - `repeated_id`
    RepeatedCancelled,

    /// A repeated task will not fire again (count exhausted or cancelled).
    ///
    /// Sets:
    /// - `repeated_id`
    RepeatedFinished,

    /// A task panicked on the timer thread; the dispatch loop kept running.
    ///
    /// Sets:
    /// - `repeated_id`: set for repeated firings
    /// - `reason`: panic message
    TimerTaskPanicked,

    // === Shutdown events ===
    /// Executor shutdown started.
    ShutdownRequested,

    /// Timer and all runners are stopped.
    ShutdownComplete,
}

/// Runtime event with optional metadata.
///
/// - `seq`: per-bus monotonic sequence (assigned on publish)
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Monotonically increasing sequence number (0 until published).
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Runner tag or pool name, if applicable.
    pub runner: Option<Arc<str>>,
    /// Repeated-task id, if applicable.
    pub repeated_id: Option<RepeatedTaskId>,
    /// Delay or interval in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (error labels, panic messages, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            runner: None,
            repeated_id: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a runner tag or pool name.
    #[inline]
    pub fn with_runner(mut self, runner: impl Into<Arc<str>>) -> Self {
        self.runner = Some(runner.into());
        self
    }

    /// Attaches a repeated-task id.
    #[inline]
    pub fn with_repeated_id(mut self, id: RepeatedTaskId) -> Self {
        self.repeated_id = Some(id);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a task-panicked event for the given pool.
    #[inline]
    pub fn task_panicked(pool: &str, info: String) -> Self {
        Event::new(EventKind::TaskPanicked)
            .with_runner(pool)
            .with_reason(info)
    }

    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskPanicked | EventKind::TimerTaskPanicked
        )
    }
}
