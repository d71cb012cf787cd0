//! # Executor: the public facade over runners and the timer.
//!
//! The [`Executor`] owns the [`Registry`] of tagged runners, the [`Timer`] and
//! the event [`Bus`]. Timed work never runs user code on the timer thread: the
//! task is wrapped as "submit to runner `tag`", and only that hand-off happens
//! on the timer thread.
//!
//! ## Flow
//! ```text
//! submit(tag, f)            ─► Registry::lookup(tag) ─► WorkerPool::execute
//! submit_for_result(tag, f) ─► Registry::lookup(tag) ─► WorkerPool::submit ─► TaskHandle<R>
//!
//! post_delayed(tag, f, d)   ─► Timer::start() (lazy)
//!                           ─► Timer::post_delayed(|| submit(tag, f), d)
//! post_repeated(tag, f, i, n)
//!                           ─► Timer::start() (lazy)
//!                           ─► Timer::post_repeated(|| submit(tag, f), i, n)
//!                                  (first hand-off happens before returning)
//! ```
//!
//! ## Shutdown
//! ```text
//! shutdown() / Drop
//!   ├─► publish ShutdownRequested
//!   ├─► phase 1: Timer::stop()        no timed hand-off can happen after this
//!   ├─► phase 2: Registry::shutdown() runners drained, threads joined
//!   └─► publish ShutdownComplete
//! ```
//! Timer wrappers hold only a `Weak<Registry>`. A hand-off to a runner that no
//! longer exists is reported as `TaskRejected` (`runner_not_found`) and dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::core::builder::ExecutorBuilder;
use crate::core::config::Config;
use crate::core::registry::Registry;
use crate::core::timer::Timer;
use crate::error::ExecutorError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{RepeatedTask, RepeatedTaskId, Task, TaskHandle};

/// Tagged runners plus a timer for delayed and repeated work.
pub struct Executor {
    cfg: Config,
    bus: Bus,
    registry: Arc<Registry>,
    timer: Timer,
    shut_down: AtomicBool,
}

impl Executor {
    /// Creates an executor with the default [`Config`].
    pub fn new() -> Self {
        ExecutorBuilder::new(Config::default()).build()
    }

    /// Returns a builder for an executor with the given configuration.
    pub fn builder(cfg: Config) -> ExecutorBuilder {
        ExecutorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: Config, bus: Bus) -> Self {
        let registry = Arc::new(Registry::new(cfg.clone(), bus.clone()));
        let timer = Timer::new(&cfg, bus.clone());
        Self {
            cfg,
            bus,
            registry,
            timer,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Registers a runner and returns the tag actually used.
    ///
    /// Always use the returned tag: an empty or already registered `tag` is
    /// replaced by a generated one.
    pub fn add_runner(&self, tag: &str) -> Result<String, ExecutorError> {
        self.registry.add_runner(tag)
    }

    /// Enqueues `task` on the runner registered under `tag`.
    ///
    /// Fails with [`ExecutorError::RunnerNotFound`] if no such runner exists;
    /// nothing is executed in that case.
    pub fn submit<F>(&self, tag: &str, task: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        debug_assert!(!tag.is_empty(), "runner tag must not be empty");
        submit_to_runner(&self.registry, &self.bus, tag, Box::new(task))
    }

    /// Enqueues `f` on the runner under `tag` and returns a handle to its result.
    ///
    /// Arguments are passed by capturing them in the closure.
    pub fn submit_for_result<F, R>(&self, tag: &str, f: F) -> Result<TaskHandle<R>, ExecutorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        debug_assert!(!tag.is_empty(), "runner tag must not be empty");
        let result = match self.registry.lookup(tag) {
            Some(pool) => pool.submit(f),
            None => Err(ExecutorError::RunnerNotFound {
                tag: tag.to_string(),
            }),
        };
        if let Err(err) = &result {
            report_rejection(&self.bus, tag, err);
        }
        result
    }

    /// Submits `task` to runner `tag` once `delay` has elapsed.
    ///
    /// Starts the timer on first use. The runner is looked up when the delay
    /// expires, not now: if it does not exist then, the task is dropped and a
    /// `TaskRejected` event is published.
    pub fn post_delayed<F>(&self, tag: &str, task: F, delay: Duration) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        debug_assert!(!tag.is_empty(), "runner tag must not be empty");
        self.timer.start()?;

        let registry = Arc::downgrade(&self.registry);
        let bus = self.bus.clone();
        let tag = tag.to_string();
        self.timer.post_delayed(
            Box::new(move || hand_off(&registry, &bus, &tag, Box::new(task))),
            delay,
        )
    }

    /// Submits `task` to runner `tag` `repeat_count` times, `interval` apart.
    ///
    /// **The first submission happens synchronously, before this returns**; the
    /// timer only defers the remaining `repeat_count - 1`. This differs from the
    /// usual "wait one interval before the first run" and is relied upon.
    ///
    /// The returned id can be passed to [`Executor::cancel`].
    pub fn post_repeated<F>(
        &self,
        tag: &str,
        task: F,
        interval: Duration,
        repeat_count: u64,
    ) -> Result<RepeatedTaskId, ExecutorError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        debug_assert!(!tag.is_empty(), "runner tag must not be empty");
        self.timer.start()?;

        let registry = Arc::downgrade(&self.registry);
        let bus = self.bus.clone();
        let tag = tag.to_string();
        let task = Arc::new(task);
        let wrapper: RepeatedTask = Arc::new(move || {
            let task = Arc::clone(&task);
            hand_off(&registry, &bus, &tag, Box::new(move || task()));
        });

        self.timer.post_repeated(wrapper, interval, repeat_count)
    }

    /// Stops future firings of a repeated task; returns whether it was active.
    ///
    /// Best effort: a firing that already passed its liveness check still
    /// reaches its runner, so at most one more execution can follow this call.
    pub fn cancel(&self, id: RepeatedTaskId) -> bool {
        self.timer.cancel(id)
    }

    /// Creates a receiver for runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Sorted list of registered runner tags.
    pub fn runners(&self) -> Vec<String> {
        self.registry.tags()
    }

    /// Configuration this executor was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Two-phase shutdown: stop the timer and join its thread, then stop every runner.
    ///
    /// Queued runner tasks are discarded; tasks already running complete.
    /// Idempotent; also performed on drop.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        info!("executor shutdown requested");

        self.timer.stop();
        self.registry.shutdown();

        self.bus.publish(Event::new(EventKind::ShutdownComplete));
        info!("executor shutdown complete");
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn submit_to_runner(
    registry: &Registry,
    bus: &Bus,
    tag: &str,
    task: Task,
) -> Result<(), ExecutorError> {
    let result = match registry.lookup(tag) {
        Some(pool) => pool.execute(task),
        None => Err(ExecutorError::RunnerNotFound {
            tag: tag.to_string(),
        }),
    };
    if let Err(err) = &result {
        report_rejection(bus, tag, err);
    }
    result
}

/// Timer-side hand-off; the registry may already be gone.
fn hand_off(registry: &Weak<Registry>, bus: &Bus, tag: &str, task: Task) {
    match registry.upgrade() {
        Some(registry) => {
            let _ = submit_to_runner(&registry, bus, tag, task);
        }
        None => report_rejection(
            bus,
            tag,
            &ExecutorError::RunnerNotFound {
                tag: tag.to_string(),
            },
        ),
    }
}

fn report_rejection(bus: &Bus, tag: &str, err: &ExecutorError) {
    bus.publish(
        Event::new(EventKind::TaskRejected)
            .with_runner(tag)
            .with_reason(err.as_label()),
    );
    debug!(runner = tag, error = %err, "task rejected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    fn count(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn incrementer(counter: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[test]
    fn test_submit_runs_task() {
        let x = Arc::new(AtomicUsize::new(0));
        {
            let executor = Executor::new();
            let tag = executor.add_runner("Test").unwrap();
            executor.submit(&tag, incrementer(&x)).unwrap();
            thread::sleep(Duration::from_millis(500));
        }
        assert_eq!(count(&x), 1);
    }

    #[test]
    fn test_submit_for_result_returns_value() {
        let x = Arc::new(AtomicUsize::new(0));
        {
            let executor = Executor::new();
            let tag = executor.add_runner("Test").unwrap();
            let side = Arc::clone(&x);
            let handle = executor
                .submit_for_result(&tag, move || {
                    side.store(1, Ordering::SeqCst);
                    20
                })
                .unwrap();
            assert_eq!(handle.wait().unwrap(), 20);
        }
        assert_eq!(count(&x), 1);
    }

    #[test]
    fn test_same_tag_preserves_submission_order() {
        let executor = Executor::new();
        let tag = executor.add_runner("ordered").unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for i in 0..50 {
            let seen = Arc::clone(&seen);
            executor.submit(&tag, move || seen.lock().push(i)).unwrap();
        }
        executor.submit_for_result(&tag, || ()).unwrap().wait().unwrap();

        assert_eq!(*seen.lock(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_tags_run_independently() {
        let executor = Executor::new();
        let slow = executor.add_runner("slow").unwrap();
        let fast = executor.add_runner("fast").unwrap();

        let (release_tx, release_rx) = mpsc::channel::<()>();
        executor
            .submit(&slow, move || {
                let _ = release_rx.recv();
            })
            .unwrap();

        let answer = executor.submit_for_result(&fast, || 42).unwrap();
        assert_eq!(answer.wait().unwrap(), 42);
        release_tx.send(()).unwrap();
    }

    #[test]
    fn test_unknown_tag_is_rejected_without_side_effects() {
        let executor = Executor::new();
        let mut rx = executor.subscribe();
        let x = Arc::new(AtomicUsize::new(0));

        let err = executor.submit("nope", incrementer(&x)).unwrap_err();
        assert!(matches!(err, ExecutorError::RunnerNotFound { ref tag } if tag == "nope"));

        let side = Arc::clone(&x);
        let err = executor
            .submit_for_result("nope", move || side.fetch_add(1, Ordering::SeqCst))
            .unwrap_err();
        assert_eq!(err.as_label(), "runner_not_found");

        thread::sleep(Duration::from_millis(50));
        assert_eq!(count(&x), 0);

        let rejected = drain(&mut rx)
            .into_iter()
            .filter(|ev| ev.kind == EventKind::TaskRejected)
            .count();
        assert_eq!(rejected, 2);
    }

    #[test]
    fn test_post_delayed_waits_then_runs() {
        let x = Arc::new(AtomicUsize::new(0));
        {
            let executor = Executor::new();
            let tag = executor.add_runner("Test").unwrap();
            executor
                .post_delayed(&tag, incrementer(&x), Duration::from_millis(500))
                .unwrap();

            thread::sleep(Duration::from_millis(200));
            assert_eq!(count(&x), 0);
            thread::sleep(Duration::from_millis(500));
        }
        assert_eq!(count(&x), 1);
    }

    #[test]
    fn test_post_delayed_runs_on_runner_thread() {
        let executor = Executor::new();
        let tag = executor.add_runner("lane").unwrap();
        let (tx, rx) = mpsc::channel();

        executor
            .post_delayed(
                &tag,
                move || {
                    let _ = tx.send(thread::current().name().map(str::to_string));
                },
                Duration::from_millis(10),
            )
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("runner-lane-0"));
    }

    #[test]
    fn test_post_repeated_fires_count_times() {
        let x = Arc::new(AtomicUsize::new(0));
        {
            let executor = Executor::new();
            let tag = executor.add_runner("Test").unwrap();
            executor
                .post_repeated(&tag, incrementer(&x), Duration::from_millis(500), 5)
                .unwrap();

            thread::sleep(Duration::from_millis(200));
            assert_eq!(count(&x), 1);
            thread::sleep(Duration::from_millis(1000));
            assert!(count(&x) >= 2);
            thread::sleep(Duration::from_millis(2000));
        }
        assert_eq!(count(&x), 5);
    }

    #[test]
    fn test_cancel_repeated_stops_future_firings() {
        let x = Arc::new(AtomicUsize::new(0));
        {
            let executor = Executor::new();
            let tag = executor.add_runner("Test").unwrap();
            let id = executor
                .post_repeated(&tag, incrementer(&x), Duration::from_millis(500), 5)
                .unwrap();

            thread::sleep(Duration::from_millis(200));
            assert_eq!(count(&x), 1);
            thread::sleep(Duration::from_millis(1000));
            assert!(count(&x) >= 2);
            assert!(executor.cancel(id));
            thread::sleep(Duration::from_millis(2000));
        }
        assert_eq!(count(&x), 3);
    }

    #[test]
    fn test_delayed_task_for_missing_runner_is_reported() {
        let executor = Executor::new();
        let mut rx = executor.subscribe();
        let x = Arc::new(AtomicUsize::new(0));

        executor
            .post_delayed("later", incrementer(&x), Duration::from_millis(10))
            .unwrap();

        wait_until(|| {
            drain(&mut rx).iter().any(|ev| {
                ev.kind == EventKind::TaskRejected && ev.runner.as_deref() == Some("later")
            })
        });
        assert_eq!(count(&x), 0);
    }

    #[test]
    fn test_shutdown_stops_timer_before_runners() {
        let executor = Executor::new();
        let mut rx = executor.subscribe();
        let tag = executor.add_runner("svc").unwrap();
        let x = Arc::new(AtomicUsize::new(0));

        executor
            .post_delayed(&tag, incrementer(&x), Duration::from_millis(100))
            .unwrap();
        executor.shutdown();
        executor.shutdown();

        thread::sleep(Duration::from_millis(200));
        assert_eq!(count(&x), 0);
        assert!(executor.runners().is_empty());
        assert!(matches!(
            executor.submit(&tag, || {}),
            Err(ExecutorError::RunnerNotFound { .. })
        ));
        assert!(matches!(
            executor.post_delayed(&tag, || {}, Duration::ZERO),
            Err(ExecutorError::AlreadyShutdown)
        ));
        assert!(matches!(
            executor.add_runner("again"),
            Err(ExecutorError::AlreadyShutdown)
        ));

        let kinds: Vec<EventKind> = drain(&mut rx).into_iter().map(|ev| ev.kind).collect();
        let requested = kinds
            .iter()
            .position(|k| *k == EventKind::ShutdownRequested)
            .unwrap();
        let timer_stopped = kinds
            .iter()
            .position(|k| *k == EventKind::TimerStopped)
            .unwrap();
        let complete = kinds
            .iter()
            .position(|k| *k == EventKind::ShutdownComplete)
            .unwrap();
        assert!(requested < timer_stopped && timer_stopped < complete);
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == EventKind::ShutdownComplete)
                .count(),
            1
        );
    }

    #[test]
    fn test_runners_lists_generated_tags() {
        let executor = Executor::new();
        let a = executor.add_runner("dup").unwrap();
        let b = executor.add_runner("dup").unwrap();
        assert_ne!(a, b);
        assert_eq!(executor.runners(), vec![b, a]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_result_handle_can_be_awaited() {
        let executor = Executor::new();
        let tag = executor.add_runner("async").unwrap();

        let handle = executor
            .submit_for_result(&tag, || "computed".to_string())
            .unwrap();
        assert_eq!(handle.await.unwrap(), "computed");
    }
}
