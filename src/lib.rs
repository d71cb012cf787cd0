//! # tasklane
//!
//! **Tasklane** is a small thread-based task executor for Rust.
//!
//! Work is submitted to named *runners*. Each runner owns one OS thread, so
//! tasks under the same tag run strictly in submission order while different
//! tags run in parallel. A shared timer thread defers work: a delayed task is
//! handed to its runner once, a repeated task a fixed number of times.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!      submit / submit_for_result        post_delayed / post_repeated / cancel
//!                 │                                     │
//!                 ▼                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Executor (facade)                                                │
//! │  - Registry (tag → single-thread WorkerPool)                      │
//! │  - Timer    (deadline heap + dispatch thread)                     │
//! │  - Bus      (broadcast events)                                    │
//! └──────┬──────────────────┬──────────────────────────────┬──────────┘
//!        ▼                  ▼                              │
//!  ┌────────────┐     ┌────────────┐      ┌────────────────┴─┐
//!  │ runner "a" │     │ runner "b" │ ◄─── │ timer thread     │
//!  │ (1 thread) │     │ (1 thread) │      │ hand-off only,   │
//!  └─────┬──────┘     └─────┬──────┘      │ never user code  │
//!        │                  │             └────────┬─────────┘
//!        │ Publishes        │ Publishes            │ Publishes
//!        │ - TaskPanicked   │ - TaskPanicked       │ - DelayedScheduled
//!        │                  │                      │ - RepeatedFinished ...
//!        ▼                  ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                   Bus (tokio broadcast channel)                   │
//! │                  (capacity: Config::bus_capacity)                 │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                         Executor::subscribe()
//! ```
//!
//! ### Repeated task lifecycle
//! ```text
//! post_repeated(tag, f, interval, n)
//!   ├─► n == 0 ─► id returned, nothing scheduled
//!   ├─► hand-off #1 to runner `tag` (synchronous, before returning)
//!   └─► remaining = n - 1; schedule at now + interval
//!
//! timer thread, at each deadline:
//!   ├─► cancelled?   ─► drop entry
//!   ├─► hand-off to runner `tag`
//!   ├─► remaining -= 1
//!   └─► remaining > 0 ? reschedule at now + interval : RepeatedFinished
//! ```
//!
//! ## Features
//! | Area             | Description                                          | Key types                              |
//! |------------------|------------------------------------------------------|----------------------------------------|
//! | **Runners**      | Tagged, ordered, single-thread execution lanes.      | [`Executor`], [`Registry`]             |
//! | **Timing**       | Delayed and repeated work with cancellation.         | [`Timer`], [`RepeatedTaskId`]          |
//! | **Pools**        | Fixed-size thread pool with result handles.          | [`WorkerPool`], [`TaskHandle`]         |
//! | **Events**       | Broadcast of lifecycle and failure events.           | [`Bus`], [`Event`], [`EventKind`]      |
//! | **Errors**       | Typed rejection errors.                              | [`ExecutorError`]                      |
//! | **Configuration**| Thread naming, stack size, bus capacity.             | [`Config`], [`ExecutorBuilder`]        |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tasklane::Executor;
//!
//! fn main() -> Result<(), tasklane::ExecutorError> {
//!     let executor = Executor::new();
//!     let tag = executor.add_runner("jobs")?;
//!
//!     executor.submit(&tag, || println!("runs on runner-jobs-0"))?;
//!
//!     let answer = executor.submit_for_result(&tag, || 6 * 7)?;
//!     assert_eq!(answer.wait()?, 42);
//!
//!     executor.post_delayed(&tag, || println!("later"), Duration::from_millis(10))?;
//!     let id = executor.post_repeated(&tag, || println!("tick"), Duration::from_millis(50), 3)?;
//!     executor.cancel(id);
//!
//!     executor.shutdown();
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod tasks;

// ---- Public re-exports ----

pub use core::{Config, Executor, ExecutorBuilder, Registry, Timer, WorkerPool};
pub use error::ExecutorError;
pub use events::{Bus, Event, EventKind};
pub use tasks::{RepeatedTask, RepeatedTaskId, Task, TaskHandle};
