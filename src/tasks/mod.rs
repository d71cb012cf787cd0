//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`Task`] - boxed one-shot closure, the unit every queue holds
//! - [`RepeatedTask`] - shared closure invoked once per repeated firing
//! - [`RepeatedTaskId`] - cancellation handle for repeated work
//! - [`TaskHandle`] - blocking/awaitable result of a submitted closure

mod handle;
mod task;

pub use handle::TaskHandle;
pub(crate) use task::panic_message;
pub use task::{RepeatedTask, RepeatedTaskId, Task};
