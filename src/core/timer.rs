//! # Timer: deadline-ordered dispatch of delayed and repeated tasks.
//!
//! [`Timer`] owns a single-thread [`WorkerPool`] whose only job is the dispatch
//! loop, plus a min-heap of entries keyed on their deadline.
//!
//! ## Dispatch loop
//! ```text
//! while running {
//!   heap empty              ─► wait (untimed)
//!   earliest.deadline > now ─► wait_until(deadline)   (a new, earlier entry wakes it)
//!   due                     ─► pop, unlock, run inline on the timer thread, relock
//! }
//! ```
//!
//! ## Repeated tasks
//! ```text
//! post_repeated(task, interval, n)
//!   ├─► id = next_id++, active.insert(id)
//!   └─► fire(remaining = n)                 (caller's thread, synchronously)
//!
//! fire(remaining):
//!   ├─ remaining == 0 || id ∉ active ─► RepeatedFinished, stop
//!   ├─ task()
//!   ├─ remaining -= 1
//!   └─ remaining > 0 ─► push entry(now + interval)   (next fire runs on the timer thread)
//! ```
//!
//! ## Rules
//! - Tasks run **inline** on the timer thread: a slow task delays every later
//!   deadline. Keep timer task bodies short (the executor only uses them to hand
//!   work to a runner).
//! - Entries with equal deadlines have no guaranteed relative order.
//! - Panics are caught at the dispatch boundary and reported as
//!   `TimerTaskPanicked`; the loop keeps running. A panicking repeated task is
//!   not rescheduled.
//! - The heap and the active set live under one mutex that is never held
//!   while a task runs.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::pool::WorkerPool;
use crate::error::ExecutorError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{RepeatedTask, RepeatedTaskId, Task, panic_message};

/// Upper bound for deadlines whose `now + delay` would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct Repeat {
    id: RepeatedTaskId,
    task: RepeatedTask,
    interval: Duration,
    remaining: u64,
}

enum Payload {
    Once(Task),
    Repeated(Repeat),
}

struct Entry {
    deadline: Instant,
    seq: u64,
    payload: Payload,
}

impl Eq for Entry {}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap, the earliest deadline must be on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct State {
    queue: BinaryHeap<Entry>,
    active: HashSet<RepeatedTaskId>,
    next_id: RepeatedTaskId,
    next_seq: u64,
    running: bool,
    stopped: bool,
}

impl State {
    fn push(&mut self, deadline: Instant, payload: Payload) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            deadline,
            seq,
            payload,
        });
    }
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
    bus: Bus,
}

/// Single-thread dispatcher for delayed and repeated tasks.
pub struct Timer {
    shared: Arc<Shared>,
    pool: WorkerPool,
    lifecycle: Mutex<()>,
}

impl Timer {
    /// Creates an idle timer; no thread exists until [`Timer::start`].
    pub fn new(cfg: &Config, bus: Bus) -> Self {
        let pool = WorkerPool::new(cfg.timer_thread_name.as_str(), 1)
            .with_bus(bus.clone())
            .with_stack_size(cfg.stack_size());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: BinaryHeap::new(),
                    active: HashSet::new(),
                    next_id: 1,
                    next_seq: 0,
                    running: false,
                    stopped: false,
                }),
                cond: Condvar::new(),
                bus,
            }),
            pool,
            lifecycle: Mutex::new(()),
        }
    }

    /// Starts the dispatch thread if it is not running yet.
    ///
    /// Safe to call before every scheduling request. Returns `Ok(true)` if this
    /// call started the thread, `Ok(false)` if it was already running, and
    /// [`ExecutorError::AlreadyShutdown`] once the timer has been stopped.
    pub fn start(&self) -> Result<bool, ExecutorError> {
        let _lifecycle = self.lifecycle.lock();
        {
            let state = self.shared.state.lock();
            if state.stopped {
                return Err(ExecutorError::AlreadyShutdown);
            }
            if state.running {
                return Ok(false);
            }
        }

        self.pool.start()?;
        self.shared.state.lock().running = true;

        let shared = Arc::clone(&self.shared);
        if let Err(err) = self.pool.execute(Box::new(move || dispatch_loop(&shared))) {
            self.shared.state.lock().running = false;
            return Err(err);
        }

        self.shared.bus.publish(Event::new(EventKind::TimerStarted));
        info!(pool = self.pool.name(), "timer started");
        Ok(true)
    }

    /// Stops the timer: pending entries are dropped, the active set is cleared,
    /// the dispatch loop is woken and its thread joined.
    ///
    /// Idempotent. A task already executing on the timer thread finishes before
    /// this returns. The timer cannot be started again.
    pub fn stop(&self) {
        let _lifecycle = self.lifecycle.lock();
        let (dropped, was_running, first_stop) = {
            let mut state = self.shared.state.lock();
            let first_stop = !state.stopped;
            let was_running = state.running;
            state.running = false;
            state.stopped = true;
            state.active.clear();
            (mem::take(&mut state.queue), was_running, first_stop)
        };
        self.shared.cond.notify_all();

        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "discarding pending timer entries");
        }
        drop(dropped);

        self.pool.stop();

        if first_stop && was_running {
            self.shared.bus.publish(Event::new(EventKind::TimerStopped));
            info!(pool = self.pool.name(), "timer stopped");
        }
    }

    /// Schedules `task` to run once on the timer thread after `delay`.
    ///
    /// Never runs the task synchronously. Entries posted before
    /// [`Timer::start`] wait for the dispatch thread.
    pub fn post_delayed(&self, task: Task, delay: Duration) -> Result<(), ExecutorError> {
        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return Err(ExecutorError::AlreadyShutdown);
            }
            state.push(deadline_after(delay), Payload::Once(task));
        }
        self.shared.cond.notify_one();

        self.shared
            .bus
            .publish(Event::new(EventKind::DelayedScheduled).with_delay(delay));
        debug!(?delay, "delayed task scheduled");
        Ok(())
    }

    /// Registers a task that fires `repeat_count` times, `interval` apart.
    ///
    /// **The first firing happens synchronously on the caller's thread**, before
    /// this returns; only the following `repeat_count - 1` firings are deferred
    /// (each `interval` after the previous one completed). With
    /// `repeat_count == 0` nothing runs and the returned id is never active.
    ///
    /// The returned id is unique for this timer and can be passed to
    /// [`Timer::cancel`].
    pub fn post_repeated(
        &self,
        task: RepeatedTask,
        interval: Duration,
        repeat_count: u64,
    ) -> Result<RepeatedTaskId, ExecutorError> {
        let id = {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return Err(ExecutorError::AlreadyShutdown);
            }
            let id = state.next_id;
            state.next_id += 1;
            if repeat_count > 0 {
                state.active.insert(id);
            }
            id
        };

        self.shared.bus.publish(
            Event::new(EventKind::RepeatedScheduled)
                .with_repeated_id(id)
                .with_delay(interval),
        );
        debug!(id, ?interval, repeat_count, "repeated task scheduled");

        self.shared.fire(Repeat {
            id,
            task,
            interval,
            remaining: repeat_count,
        });
        Ok(id)
    }

    /// Removes `id` from the active set; returns whether it was active.
    ///
    /// Cancellation is advisory and only takes effect at the next firing
    /// boundary: a firing that already passed its liveness check runs to
    /// completion, so at most one more execution may be observed after this
    /// call returns.
    pub fn cancel(&self, id: RepeatedTaskId) -> bool {
        let removed = self.shared.state.lock().active.remove(&id);
        if removed {
            self.shared
                .bus
                .publish(Event::new(EventKind::RepeatedCancelled).with_repeated_id(id));
            debug!(id, "repeated task cancelled");
        }
        removed
    }

    /// True while `id` is still eligible to fire again.
    pub fn is_active(&self, id: RepeatedTaskId) -> bool {
        self.shared.state.lock().active.contains(&id)
    }

    /// Number of entries waiting in the heap.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// True while the dispatch thread is running.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    /// Runs one firing of a repeated task and schedules the next one.
    fn fire(&self, mut repeat: Repeat) {
        let live = repeat.remaining > 0 && self.state.lock().active.contains(&repeat.id);
        if !live {
            self.finish(repeat.id);
            return;
        }

        let task = &repeat.task;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task())) {
            self.bus.publish(
                Event::new(EventKind::TimerTaskPanicked)
                    .with_repeated_id(repeat.id)
                    .with_reason(panic_message(&*payload)),
            );
            self.finish(repeat.id);
            return;
        }

        repeat.remaining -= 1;
        if repeat.remaining == 0 {
            self.finish(repeat.id);
            return;
        }

        {
            let mut state = self.state.lock();
            if state.stopped {
                return;
            }
            state.push(deadline_after(repeat.interval), Payload::Repeated(repeat));
        }
        self.cond.notify_one();
    }

    fn finish(&self, id: RepeatedTaskId) {
        self.state.lock().active.remove(&id);
        self.bus
            .publish(Event::new(EventKind::RepeatedFinished).with_repeated_id(id));
    }

    fn dispatch(&self, entry: Entry) {
        match entry.payload {
            Payload::Once(task) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    self.bus.publish(
                        Event::new(EventKind::TimerTaskPanicked)
                            .with_reason(panic_message(&*payload)),
                    );
                }
            }
            Payload::Repeated(repeat) => self.fire(repeat),
        }
    }
}

fn dispatch_loop(shared: &Shared) {
    let mut state = shared.state.lock();
    while state.running {
        let deadline = match state.queue.peek() {
            Some(entry) => entry.deadline,
            None => {
                shared.cond.wait(&mut state);
                continue;
            }
        };

        if deadline > Instant::now() {
            shared.cond.wait_until(&mut state, deadline);
            continue;
        }

        if let Some(entry) = state.queue.pop() {
            MutexGuard::unlocked(&mut state, || shared.dispatch(entry));
        }
    }
}

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .unwrap_or_else(|| now + FAR_FUTURE)
}
