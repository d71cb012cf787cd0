//! # Fixed-size worker pool.
//!
//! [`WorkerPool`] owns `N` OS threads draining one shared FIFO queue of [`Task`]s.
//! Runners and the timer are both built from it.
//!
//! ## Lifecycle
//! ```text
//! new() ──► created ──start()──► started ──stop()──► stopped
//!              │                    │                  │
//!              │ submit → Err       │ submit → Ok      │ submit → Err
//!              │                    │ start → Ok(false)│ start → Ok(false)
//! ```
//!
//! ## Worker loop
//! ```text
//! loop {
//!   wait until shutdown || !queue.is_empty()
//!   shutdown?  ─► exit (queued tasks are NOT drained)
//!   pop_front  ─► run outside the lock (panics caught → TaskPanicked)
//! }
//! ```
//!
//! ## Rules
//! - **Stop fast**: `stop()` clears the queue. Tasks queued but not dequeued are
//!   dropped (their handles resolve to `TaskAbandoned`); a task already running
//!   finishes before its worker is joined.
//! - One mutex guards the queue and both flags; one condvar signals
//!   "non-empty or shutdown". Tasks never run under the lock.
//! - A stopped pool is never restarted.

use std::collections::VecDeque;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ExecutorError;
use crate::events::{Bus, Event};
use crate::tasks::{Task, TaskHandle, panic_message};

/// Queue and flags, guarded together.
struct State {
    tasks: VecDeque<Task>,
    available: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

/// Fixed number of worker threads draining a FIFO queue.
pub struct WorkerPool {
    name: Arc<str>,
    threads: usize,
    stack_size: Option<usize>,
    bus: Option<Bus>,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates a pool in the not-yet-started state.
    ///
    /// Worker threads are named `"{name}-{index}"`.
    pub fn new(name: impl Into<Arc<str>>, threads: usize) -> Self {
        debug_assert!(threads > 0, "a worker pool needs at least one thread");
        Self {
            name: name.into(),
            threads: threads.max(1),
            stack_size: None,
            bus: None,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    tasks: VecDeque::new(),
                    available: false,
                    shutdown: false,
                }),
                cond: Condvar::new(),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Reports task panics on `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Sets the stack size of worker threads (`None` = platform default).
    pub fn with_stack_size(mut self, stack_size: Option<usize>) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// True while the pool accepts tasks.
    pub fn is_available(&self) -> bool {
        let state = self.shared.state.lock();
        state.available && !state.shutdown
    }

    /// Number of queued tasks not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    /// Spawns the worker threads.
    ///
    /// Returns `Ok(true)` if this call started the pool and `Ok(false)` if it was
    /// already started or already stopped. If a thread cannot be spawned, the
    /// threads spawned so far are joined, the pool ends up stopped and
    /// [`ExecutorError::Spawn`] is returned.
    pub fn start(&self) -> Result<bool, ExecutorError> {
        let mut workers = self.workers.lock();
        {
            let mut state = self.shared.state.lock();
            if state.available || state.shutdown {
                return Ok(false);
            }
            state.available = true;
        }

        for index in 0..self.threads {
            let thread_name = format!("{}-{}", self.name, index);
            let mut builder = thread::Builder::new().name(thread_name.clone());
            if let Some(size) = self.stack_size {
                builder = builder.stack_size(size);
            }

            let shared = Arc::clone(&self.shared);
            let name = Arc::clone(&self.name);
            let bus = self.bus.clone();

            match builder.spawn(move || worker_loop(&shared, &name, bus.as_ref())) {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    let spawned = mem::take(&mut *workers);
                    drop(workers);
                    self.shutdown_and_join(spawned);
                    return Err(ExecutorError::Spawn {
                        name: thread_name,
                        source,
                    });
                }
            }
        }

        debug!(pool = %self.name, threads = self.threads, "worker pool started");
        Ok(true)
    }

    /// Stops the pool: sets shutdown, drops queued tasks, wakes and joins every worker.
    ///
    /// Idempotent. A task that is already running completes first. When called
    /// from one of this pool's own workers, that worker is not joined (it exits
    /// after the current task returns).
    pub fn stop(&self) {
        let handles = mem::take(&mut *self.workers.lock());
        self.shutdown_and_join(handles);
    }

    /// Enqueues a closure and returns a handle to its result.
    ///
    /// Never blocks. Fails with [`ExecutorError::PoolUnavailable`] when the pool
    /// is not started or already stopped; the closure is dropped in that case.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>, ExecutorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.execute(Box::new(move || {
            let _ = tx.send(f());
        }))?;
        Ok(TaskHandle::new(rx))
    }

    /// Enqueues a task without a result handle.
    pub fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        let mut state = self.shared.state.lock();
        if state.shutdown || !state.available {
            return Err(ExecutorError::PoolUnavailable {
                pool: self.name.to_string(),
            });
        }
        state.tasks.push_back(task);
        drop(state);

        self.shared.cond.notify_one();
        Ok(())
    }

    fn shutdown_and_join(&self, handles: Vec<JoinHandle<()>>) {
        let dropped = {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.available = false;
            mem::take(&mut state.tasks)
        };
        self.shared.cond.notify_all();

        if !dropped.is_empty() {
            debug!(pool = %self.name, dropped = dropped.len(), "discarding queued tasks");
        }
        drop(dropped);

        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Shared, name: &str, bus: Option<&Bus>) {
    loop {
        let task = {
            let mut state = shared.state.lock();
            shared
                .cond
                .wait_while(&mut state, |s| !s.shutdown && s.tasks.is_empty());
            if state.shutdown {
                break;
            }
            match state.tasks.pop_front() {
                Some(task) => task,
                None => continue,
            }
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            if let Some(bus) = bus {
                bus.publish(Event::task_panicked(name, panic_message(&*payload)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, mpsc};
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let pool = WorkerPool::new("idem", 2);
        assert!(!pool.is_available());
        assert!(pool.start().unwrap());
        assert!(!pool.start().unwrap());
        assert!(pool.is_available());

        pool.stop();
        pool.stop();
        assert!(!pool.is_available());
        assert!(!pool.start().unwrap(), "a stopped pool never restarts");
    }

    #[test]
    fn test_submit_requires_started_pool() {
        let pool = WorkerPool::new("cold", 1);
        let err = pool.submit(|| 1).unwrap_err();
        assert!(matches!(err, ExecutorError::PoolUnavailable { ref pool } if pool == "cold"));

        pool.start().unwrap();
        pool.stop();
        assert!(matches!(
            pool.execute(Box::new(|| {})),
            Err(ExecutorError::PoolUnavailable { .. })
        ));
    }

    #[test]
    fn test_single_thread_runs_in_submission_order() {
        let pool = WorkerPool::new("fifo", 1);
        pool.start().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut last = None;
        for i in 0..100 {
            let seen = Arc::clone(&seen);
            last = Some(pool.submit(move || seen.lock().push(i)).unwrap());
        }
        last.unwrap().wait().unwrap();

        assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_threads_run_in_parallel() {
        let pool = WorkerPool::new("wide", 4);
        pool.start().unwrap();

        // Deadlocks unless all four tasks run at the same time.
        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                pool.submit(move || {
                    barrier.wait();
                    i
                })
                .unwrap()
            })
            .collect();

        let sum: i32 = handles.into_iter().map(|h| h.wait().unwrap()).sum();
        assert_eq!(sum, 6);
    }

    #[test]
    fn test_stop_discards_queued_but_finishes_running() {
        let pool = Arc::new(WorkerPool::new("fast-stop", 1));
        pool.start().unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let finished = Arc::new(AtomicUsize::new(0));
        let queued_runs = Arc::new(AtomicUsize::new(0));

        let running = {
            let finished = Arc::clone(&finished);
            pool.submit(move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };
        let queued: Vec<_> = (0..3)
            .map(|_| {
                let queued_runs = Arc::clone(&queued_runs);
                pool.submit(move || {
                    queued_runs.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
            })
            .collect();

        started_rx.recv().unwrap();
        let stopper = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.stop())
        };
        wait_until(|| !pool.is_available());
        assert_eq!(pool.pending(), 0);

        release_tx.send(()).unwrap();
        stopper.join().unwrap();

        assert!(running.wait().is_ok());
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(queued_runs.load(Ordering::SeqCst), 0);
        for handle in queued {
            assert!(matches!(handle.wait(), Err(ExecutorError::TaskAbandoned)));
        }
    }

    #[test]
    fn test_panicking_task_does_not_kill_worker() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let pool = WorkerPool::new("panicky", 1).with_bus(bus);
        pool.start().unwrap();

        let failed = pool.submit(|| -> u32 { panic!("task blew up") }).unwrap();
        assert!(matches!(failed.wait(), Err(ExecutorError::TaskAbandoned)));

        let ok = pool.submit(|| 7).unwrap();
        assert_eq!(ok.wait().unwrap(), 7);

        let ev = rx.try_recv().expect("panic event");
        assert_eq!(ev.kind, EventKind::TaskPanicked);
        assert_eq!(ev.runner.as_deref(), Some("panicky"));
        assert_eq!(ev.reason.as_deref(), Some("task blew up"));
    }

    #[test]
    fn test_stop_from_own_worker_does_not_deadlock() {
        let pool = Arc::new(WorkerPool::new("self-stop", 1));
        pool.start().unwrap();

        let inner = Arc::clone(&pool);
        let handle = pool.submit(move || inner.stop()).unwrap();
        handle.wait().unwrap();

        assert!(!pool.is_available());
        pool.stop();
    }

    #[test]
    fn test_worker_threads_are_named() {
        let pool = WorkerPool::new("named", 1).with_stack_size(Some(512 * 1024));
        pool.start().unwrap();

        let name = pool
            .submit(|| thread::current().name().map(str::to_string))
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(name.as_deref(), Some("named-0"));
        assert_eq!(pool.threads(), 1);
        assert_eq!(pool.name(), "named");
    }
}
