//! Error type used by the tasklane runtime.
//!
//! [`ExecutorError`] covers every failure the runtime reports to callers:
//! submitting against an unknown runner, against a pool that is not running,
//! operating on a stopped timer, losing a task before it produced its result,
//! or failing to spawn an OS thread.
//!
//! None of these are fatal to the process. Failures inside a task body are not
//! represented here: they belong to the caller.
//!
//! Like the event kinds, each variant has a stable label (`as_label`) for
//! logs and metrics.

use std::io;
use thiserror::Error;

/// # Errors produced by the tasklane runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// No runner is registered under the given tag (never created, or the
    /// registry has already been shut down).
    #[error("runner {tag:?} not found")]
    RunnerNotFound {
        /// The tag that was looked up.
        tag: String,
    },

    /// The worker pool has not been started yet or was already stopped.
    #[error("pool {pool:?} is not accepting tasks")]
    PoolUnavailable {
        /// Name of the pool that refused the task.
        pool: String,
    },

    /// The component was stopped; the operation was ignored.
    #[error("already shut down")]
    AlreadyShutdown,

    /// The task was dropped before producing a result: its pool stopped with
    /// the task still queued, or the task panicked.
    #[error("task abandoned before producing a result")]
    TaskAbandoned,

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn thread {name:?}: {source}")]
    Spawn {
        /// Name of the thread that could not be created.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl ExecutorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tasklane::ExecutorError;
    ///
    /// let err = ExecutorError::RunnerNotFound { tag: "io".into() };
    /// assert_eq!(err.as_label(), "runner_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecutorError::RunnerNotFound { .. } => "runner_not_found",
            ExecutorError::PoolUnavailable { .. } => "pool_unavailable",
            ExecutorError::AlreadyShutdown => "already_shutdown",
            ExecutorError::TaskAbandoned => "task_abandoned",
            ExecutorError::Spawn { .. } => "thread_spawn_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ExecutorError::RunnerNotFound { tag } => format!("unknown runner: {tag}"),
            ExecutorError::PoolUnavailable { pool } => format!("pool unavailable: {pool}"),
            ExecutorError::AlreadyShutdown => "already shut down".to_string(),
            ExecutorError::TaskAbandoned => "task dropped without result".to_string(),
            ExecutorError::Spawn { name, source } => format!("spawn {name}: {source}"),
        }
    }

    /// Indicates whether the error means "nothing was done" rather than a
    /// resource failure.
    ///
    /// Returns `true` for [`ExecutorError::RunnerNotFound`],
    /// [`ExecutorError::PoolUnavailable`] and [`ExecutorError::AlreadyShutdown`].
    ///
    /// # Example
    /// ```
    /// use tasklane::ExecutorError;
    ///
    /// assert!(ExecutorError::AlreadyShutdown.is_rejection());
    /// assert!(!ExecutorError::TaskAbandoned.is_rejection());
    /// ```
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ExecutorError::RunnerNotFound { .. }
                | ExecutorError::PoolUnavailable { .. }
                | ExecutorError::AlreadyShutdown
        )
    }
}
