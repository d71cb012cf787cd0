//! # Runtime configuration.
//!
//! Provides [`Config`], the centralized settings for an [`Executor`](crate::Executor).
//!
//! Config is used in two ways:
//! 1. **Executor creation**: `ExecutorBuilder::new(config).build()`
//! 2. **Thread naming**: runners and the timer derive their OS thread names from it
//!
//! ## Sentinel values
//! - `stack_size = 0` → platform default stack size
//! - `bus_capacity = 0` → clamped to 1 by the bus

/// Global configuration for the executor runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `runner_thread_prefix`: Prefix of runner thread names (`"{prefix}-{tag}-{index}"`)
/// - `timer_thread_name`: Name of the timer's pool (its thread is `"{name}-0"`)
/// - `stack_size`: Stack size for every spawned thread (`0` = platform default)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Prefix used to name runner threads.
    pub runner_thread_prefix: String,

    /// Name of the timer's single-thread pool.
    pub timer_thread_name: String,

    /// Stack size in bytes for spawned threads.
    ///
    /// - `0` = platform default
    /// - `> 0` = passed to `std::thread::Builder::stack_size`
    pub stack_size: usize,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the thread stack size as an `Option`.
    ///
    /// - `None` → platform default
    /// - `Some(n)` → explicit size
    #[inline]
    pub fn stack_size(&self) -> Option<usize> {
        if self.stack_size == 0 {
            None
        } else {
            Some(self.stack_size)
        }
    }

    /// Pool name for the runner registered under `tag`.
    #[inline]
    pub fn runner_pool_name(&self, tag: &str) -> String {
        format!("{}-{}", self.runner_thread_prefix, tag)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `runner_thread_prefix = "runner"`
    /// - `timer_thread_name = "timer"`
    /// - `stack_size = 0` (platform default)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            runner_thread_prefix: "runner".to_string(),
            timer_thread_name: "timer".to_string(),
            stack_size: 0,
        }
    }
}
