//! # Runner registry: tag → dedicated single-thread pool.
//!
//! Each runner is a [`WorkerPool`] with exactly one thread, so everything
//! submitted under one tag runs in submission order while different tags run
//! independently.
//!
//! ## Architecture
//! ```text
//! add_runner("io") ──► lock ──► "io" free?  ──yes──► WorkerPool("runner-io", 1).start()
//!                                   │                        │
//!                                   no / empty               ▼
//!                                   │                 map.insert(tag, pool) ──► RunnerAdded
//!                                   └─► next_tag += 1 until free ──┘
//!
//! lookup("io") ──► lock ──► Option<Arc<WorkerPool>>
//! shutdown()   ──► lock ──► drain map ──► unlock ──► pool.stop() for each
//! ```
//!
//! ## Rules
//! - The returned tag is the one to use: a requested tag that is empty or
//!   already taken is silently replaced by a generated one.
//! - Runners are never removed individually; they live until [`Registry::shutdown`].
//! - One registry-wide lock serializes map access. It is never held while a
//!   task runs or while runner threads are joined.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::core::config::Config;
use crate::core::pool::WorkerPool;
use crate::error::ExecutorError;
use crate::events::{Bus, Event, EventKind};

struct Runners {
    pools: HashMap<String, Arc<WorkerPool>>,
    next_tag: u64,
    closed: bool,
}

/// Registry of tagged single-thread runners.
pub struct Registry {
    cfg: Config,
    bus: Bus,
    runners: Mutex<Runners>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new(cfg: Config, bus: Bus) -> Self {
        Self {
            cfg,
            bus,
            runners: Mutex::new(Runners {
                pools: HashMap::new(),
                next_tag: 0,
                closed: false,
            }),
        }
    }

    /// Registers and starts a runner, returning the tag actually used.
    ///
    /// If `tag` is empty or already registered, the next free value of an
    /// internal counter (rendered as a decimal string) is used instead.
    pub fn add_runner(&self, tag: &str) -> Result<String, ExecutorError> {
        let mut runners = self.runners.lock();
        if runners.closed {
            return Err(ExecutorError::AlreadyShutdown);
        }

        let mut actual = tag.to_string();
        while actual.is_empty() || runners.pools.contains_key(&actual) {
            runners.next_tag += 1;
            actual = runners.next_tag.to_string();
        }

        let pool = WorkerPool::new(self.cfg.runner_pool_name(&actual), 1)
            .with_bus(self.bus.clone())
            .with_stack_size(self.cfg.stack_size());
        pool.start()?;
        runners.pools.insert(actual.clone(), Arc::new(pool));
        drop(runners);

        let mut ev = Event::new(EventKind::RunnerAdded).with_runner(actual.as_str());
        if actual != tag {
            ev = ev.with_reason(format!("requested={tag:?}"));
        }
        self.bus.publish(ev);
        info!(requested = tag, runner = %actual, "runner added");

        Ok(actual)
    }

    /// Returns the runner registered under `tag`, if any.
    pub fn lookup(&self, tag: &str) -> Option<Arc<WorkerPool>> {
        self.runners.lock().pools.get(tag).cloned()
    }

    /// Returns sorted list of registered tags.
    pub fn tags(&self) -> Vec<String> {
        let runners = self.runners.lock();
        let mut tags: Vec<String> = runners.pools.keys().cloned().collect();
        tags.sort_unstable();
        tags
    }

    /// Number of registered runners.
    pub fn len(&self) -> usize {
        self.runners.lock().pools.len()
    }

    /// Returns true if no runner is registered.
    pub fn is_empty(&self) -> bool {
        self.runners.lock().pools.is_empty()
    }

    /// Drains the registry and stops every runner.
    ///
    /// Afterwards `lookup` returns `None` and `add_runner` fails with
    /// [`ExecutorError::AlreadyShutdown`]. Idempotent.
    pub fn shutdown(&self) {
        let pools: Vec<(String, Arc<WorkerPool>)> = {
            let mut runners = self.runners.lock();
            runners.closed = true;
            runners.pools.drain().collect()
        };

        if pools.is_empty() {
            return;
        }
        for (_, pool) in &pools {
            pool.stop();
        }
        info!(runners = pools.len(), "runners stopped");
    }
}
