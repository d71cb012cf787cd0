use crate::{core::Config, events::Bus};

use super::executor::Executor;

/// Builder for constructing an [`Executor`] with optional features.
pub struct ExecutorBuilder {
    cfg: Config,
    bus: Option<Bus>,
}

impl ExecutorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self { cfg, bus: None }
    }

    /// Publishes runtime events on an existing bus instead of a fresh one.
    ///
    /// Useful when several executors should feed the same subscribers.
    /// `Config::bus_capacity` is ignored in that case.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds and returns the Executor instance.
    ///
    /// No thread is spawned here: runner threads start in `add_runner`, the
    /// timer thread on the first delayed or repeated post.
    pub fn build(self) -> Executor {
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.cfg.bus_capacity_clamped()));
        Executor::new_internal(self.cfg, bus)
    }
}
