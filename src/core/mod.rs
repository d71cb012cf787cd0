//! Runtime core: runners, timer and their lifecycle.
//!
//! The public entry point is [`Executor`]; the building blocks are exported
//! as well for callers that only need one of them.
//!
//! Modules:
//! - [`pool`]: fixed-size OS thread pool with a FIFO queue;
//! - [`registry`]: tag → single-thread pool map;
//! - [`timer`]: deadline queue and dispatch thread for delayed/repeated work;
//! - [`executor`]: facade wiring the above together, two-phase shutdown;
//! - [`builder`]: executor construction;
//! - [`config`]: runtime settings.

mod builder;
mod config;
mod executor;
mod pool;
mod registry;
mod timer;

pub use builder::ExecutorBuilder;
pub use config::Config;
pub use executor::Executor;
pub use pool::WorkerPool;
pub use registry::Registry;
pub use timer::Timer;
