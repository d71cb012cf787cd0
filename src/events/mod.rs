//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by pools, the registry, the
//! timer and the executor facade.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `WorkerPool` workers (panics), `Registry` (runner added),
//!   `Timer` (scheduling, cancellation, panics), `Executor` (rejections, shutdown).
//! - **Consumers**: whoever calls [`Executor::subscribe`](crate::Executor::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
