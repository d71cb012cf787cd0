//! # Example: repeated
//!
//! Two runners, one delayed task, one repeated task that gets cancelled halfway.
//!
//! Demonstrates how to:
//! - Register runners with [`Executor::add_runner`] and use the returned tag.
//! - Schedule work with `post_delayed` / `post_repeated`.
//! - Cancel a repeated task and watch runtime events on the bus.
//!
//! ## Flow
//! ```text
//! post_repeated("ticks", tick, 200ms, 10)
//!     ├─► tick #1 handed to runner "ticks" before returning
//!     ├─► timer thread: tick #2, #3, ... every 200ms
//!     └─► cancel(id) after ~700ms ─► RepeatedCancelled, at most one more tick
//! post_delayed("report", report, 500ms)
//!     └─► timer thread hands report to runner "report"
//! shutdown()
//!     ├─► TimerStopped
//!     └─► ShutdownComplete
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example repeated
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tasklane::{EventKind, Executor};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let executor = Executor::new();

    // 1. Print every event until shutdown completes
    let mut events = executor.subscribe();
    let listener = thread::spawn(move || {
        while let Ok(ev) = events.blocking_recv() {
            println!("[event #{}] {:?} runner={:?} id={:?}", ev.seq, ev.kind, ev.runner, ev.repeated_id);
            if ev.kind == EventKind::ShutdownComplete {
                break;
            }
        }
    });

    // 2. Register runners (always keep the returned tag)
    let ticks = executor.add_runner("ticks")?;
    let report = executor.add_runner("report")?;

    // 3. Repeated work
    let counter = Arc::new(AtomicUsize::new(0));
    let tick_counter = Arc::clone(&counter);
    let id = executor.post_repeated(
        &ticks,
        move || {
            let n = tick_counter.fetch_add(1, Ordering::SeqCst) + 1;
            println!("[ticks] tick {n}");
        },
        Duration::from_millis(200),
        10,
    )?;

    // 4. Delayed work on another runner
    let seen = Arc::clone(&counter);
    executor.post_delayed(
        &report,
        move || println!("[report] ticks so far: {}", seen.load(Ordering::SeqCst)),
        Duration::from_millis(500),
    )?;

    // 5. Cancel halfway
    thread::sleep(Duration::from_millis(700));
    println!("[main] cancel -> {}", executor.cancel(id));

    thread::sleep(Duration::from_millis(500));
    executor.shutdown();
    let _ = listener.join();

    println!("[main] total ticks: {}", counter.load(Ordering::SeqCst));
    Ok(())
}
