//! # Task types.
//!
//! A [`Task`] is an opaque, no-argument, no-return unit of work: a boxed
//! closure that owns its captured state and runs at most once. Ownership moves
//! into whichever queue holds it; if the queue is cleared before a worker
//! dequeues it, the task is simply dropped.
//!
//! A [`RepeatedTask`] is the shared, re-invocable form used by the timer for
//! repeated scheduling.

use std::any::Any;
use std::sync::Arc;

/// One-shot unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Unit of work that may be invoked many times (repeated timer firings).
pub type RepeatedTask = Arc<dyn Fn() + Send + Sync + 'static>;

/// Identifier of a repeated task, unique per timer and never reused.
pub type RepeatedTaskId = u64;

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
