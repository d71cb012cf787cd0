//! # Result handle for submitted work.
//!
//! [`TaskHandle`] is returned by result-bearing submissions. It wraps a
//! [`tokio::sync::oneshot`] receiver, so the value produced by the task can be
//! read either by blocking ([`TaskHandle::wait`]) or by awaiting the handle.
//!
//! ## Rules
//! - The value is delivered **exactly once**.
//! - If the task is dropped before running (pool stopped with the task still
//!   queued) or panics, the handle resolves to [`ExecutorError::TaskAbandoned`].
//!
//! ## Example
//! ```rust
//! use tasklane::Executor;
//!
//! let executor = Executor::new();
//! let tag = executor.add_runner("math").unwrap();
//! let handle = executor.submit_for_result(&tag, || 6 * 7).unwrap();
//! assert_eq!(handle.wait().unwrap(), 42);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::ExecutorError;

/// Handle to the eventual result of a submitted task.
#[derive(Debug)]
#[must_use = "dropping the handle discards the task's result"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Blocks the calling thread until the task has produced its value.
    ///
    /// # Panics
    /// Panics when called from within an asynchronous execution context; await
    /// the handle there instead.
    pub fn wait(self) -> Result<T, ExecutorError> {
        self.rx
            .blocking_recv()
            .map_err(|_| ExecutorError::TaskAbandoned)
    }

    /// Returns the value if the task already finished, without blocking.
    ///
    /// - `None` → still pending
    /// - `Some(Ok(v))` → the value (only once; later calls report `TaskAbandoned`)
    /// - `Some(Err(TaskAbandoned))` → the task will never produce a value
    pub fn try_take(&mut self) -> Option<Result<T, ExecutorError>> {
        match self.rx.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ExecutorError::TaskAbandoned)),
        }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, ExecutorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| ExecutorError::TaskAbandoned))
    }
}
