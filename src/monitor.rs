//! # Pool Monitor
//!
//! Periodic controller for the adaptive pool mode. On every tick the
//! monitor samples queue depth and idle-worker count and rescales the
//! worker set, always staying within the configured `[min, max]` bounds.
//!
//! ## Scaling Policy
//! - Scale up when queued tasks exceed the idle workers available to take
//!   them: spawn the shortfall, capped at `max_threads`. Pending
//!   retirement requests are withdrawn first.
//! - Scale down when the queue is empty and idle workers exceed the
//!   minimum: request the surplus to retire. Retirement is claimed by a
//!   worker only between tasks, never mid-task.
//! - Each tick also reaps (joins) worker threads that have already exited.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::pool::{PoolCore, PoolState};

/// Handle to the monitor thread; lifetime bound to its pool.
pub(crate) struct Monitor {
    handle: thread::JoinHandle<()>,
    /// Stop flag plus condvar so shutdown can end a tick wait immediately.
    signal: Arc<(Mutex<bool>, Condvar)>,
}

impl Monitor {
    /// Starts the monitor thread ticking every `interval`.
    pub(crate) fn start(core: Arc<PoolCore>, interval: Duration) -> Self {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("workpool-monitor".to_string())
            .spawn(move || run(&core, interval, &thread_signal))
            .expect("failed to spawn monitor thread");
        Self { handle, signal }
    }

    /// Signals the monitor to stop and waits for it to exit.
    pub(crate) fn stop(self) {
        {
            let (lock, cvar) = &*self.signal;
            *lock.lock().unwrap() = true;
            cvar.notify_one();
        }
        let _ = self.handle.join();
    }
}

fn run(core: &Arc<PoolCore>, interval: Duration, signal: &(Mutex<bool>, Condvar)) {
    debug!(interval = ?interval, "monitor started");
    loop {
        {
            let (lock, cvar) = signal;
            let guard = lock.lock().unwrap();
            if *guard {
                break;
            }
            let (guard, _timeout) = cvar.wait_timeout(guard, interval).unwrap();
            if *guard {
                break;
            }
        }
        tick(core);
    }
    debug!("monitor stopped");
}

/// One observation/decision cycle.
fn tick(core: &Arc<PoolCore>) {
    let depth = core.queue.len();
    let idle = core
        .idle_workers
        .load(std::sync::atomic::Ordering::Acquire);
    let (live, retiring, state) = {
        let shared = core.shared.lock();
        (shared.live_workers, shared.retiring, shared.state)
    };
    if state != PoolState::Running {
        return;
    }

    let min = core.config.min_threads;
    let max = core.config.max_threads;

    if depth > idle && live < max {
        // Load outgrew the idle capacity; any pending shrink is stale.
        let cancelled = core.queue.cancel_retirements();
        if cancelled > 0 {
            core.shared.lock().retiring -= cancelled;
        }
        let grow = (depth - idle).min(max - live);
        info!(
            grow,
            live,
            queue_depth = depth,
            idle_workers = idle,
            "scaling up worker set"
        );
        for _ in 0..grow {
            // Spawn failure is logged with its count rolled back; retry
            // on the next tick rather than hammering a starved system.
            if !core.spawn_worker() {
                break;
            }
        }
    } else if depth == 0 && idle > 0 {
        // `live - retiring` is the worker count once claimed retirements
        // finish; requests are sized against it so live never drops
        // below the minimum.
        let settled = live - retiring;
        if settled > min {
            let shrink = (settled - min).min(idle);
            if shrink > 0 {
                debug!(
                    shrink,
                    live,
                    idle_workers = idle,
                    "retiring idle workers"
                );
                core.shared.lock().retiring += shrink;
                core.queue.request_retirements(shrink);
            }
        }
    }

    reap_finished(core);
}

/// Joins worker threads that have already exited (retired workers), so the
/// handle list does not grow for the pool's lifetime.
fn reap_finished(core: &Arc<PoolCore>) {
    let mut workers = core.workers.lock().unwrap();
    let mut index = 0;
    while index < workers.len() {
        if workers[index].is_finished() {
            workers.swap_remove(index).join();
        } else {
            index += 1;
        }
    }
}
