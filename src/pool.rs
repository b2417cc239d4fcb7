//! # Worker Pool
//!
//! The aggregate owner of the task queue and the worker set.
//!
//! ## Key Concepts
//! - **Fixed mode**: a static set of workers created at construction
//! - **Adaptive mode**: a monitor thread rescales the worker set between
//!   `min_threads` and `max_threads` on a fixed interval
//! - **Backpressure**: with a bounded queue, `submit` blocks the producer
//!   until a slot frees; `try_submit` and `submit_timeout` offer the
//!   non-blocking and bounded-wait variants
//!
//! ## Thread Safety
//! - The queue carries every blocking rendezvous (mutex + condvars)
//! - Worker count and pool state are the only spin-lock-protected fields;
//!   the lock is held for O(1) updates, never across a blocking call
//! - Observability counters are atomics
//!
//! ## Shutdown
//! Graceful shutdown follows Running → Draining → Stopped: new submissions
//! fail with `PoolClosed`, queued and in-flight tasks complete, the monitor
//! stops before the workers drain, and every thread is joined before
//! `shutdown` returns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::{error, info};

use crate::config::PoolConfig;
use crate::error::{ConfigError, SubmitError};
use crate::monitor::Monitor;
use crate::queue::TaskQueue;
use crate::spin::SpinLock;
use crate::task::{self, TaskHandle};
use crate::worker::Worker;

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting and executing tasks.
    Running,
    /// Rejecting new tasks while queued and in-flight work completes.
    Draining,
    /// All workers joined; the queue is empty.
    Stopped,
}

/// Snapshot of pool health, in the spirit of a scheduler metrics readout.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Workers currently alive (including ones executing a task).
    pub live_workers: usize,
    /// Workers not currently executing a task.
    pub idle_workers: usize,
    /// Tasks waiting in the queue.
    pub queue_depth: usize,
    /// Tasks that ran to completion.
    pub completed_tasks: usize,
    /// Tasks that panicked.
    pub failed_tasks: usize,
    /// Current lifecycle state.
    pub state: PoolState,
}

/// Worker-count and state bookkeeping; guarded by the spin lock.
pub(crate) struct PoolShared {
    pub(crate) state: PoolState,
    pub(crate) live_workers: usize,
    /// Workers with an outstanding or claimed retirement, not yet exited.
    pub(crate) retiring: usize,
    pub(crate) next_worker_id: usize,
}

/// State shared between the pool handle, its workers, and the monitor.
pub(crate) struct PoolCore {
    pub(crate) queue: TaskQueue,
    pub(crate) shared: SpinLock<PoolShared>,
    pub(crate) idle_workers: AtomicUsize,
    pub(crate) completed_tasks: AtomicUsize,
    pub(crate) failed_tasks: AtomicUsize,
    pub(crate) workers: Mutex<Vec<Worker>>,
    pub(crate) config: PoolConfig,
    /// Set once the pool reaches `Stopped`; lets concurrent shutdown
    /// callers that lost the drain race block until teardown finishes.
    stopped_latch: Mutex<bool>,
    stopped_cvar: Condvar,
}

impl PoolCore {
    /// Registers and starts one worker. The live count is claimed before
    /// the thread runs so bounds checks never observe an undercount; a
    /// failed spawn rolls the claim back. Returns whether a worker started.
    pub(crate) fn spawn_worker(self: &Arc<Self>) -> bool {
        let id = {
            let mut shared = self.shared.lock();
            shared.live_workers += 1;
            let id = shared.next_worker_id;
            shared.next_worker_id += 1;
            id
        };
        match Worker::spawn(id, Arc::clone(self)) {
            Ok(worker) => {
                self.workers.lock().unwrap().push(worker);
                true
            }
            Err(error) => {
                self.shared.lock().live_workers -= 1;
                error!(worker_id = id, %error, "failed to spawn worker thread");
                false
            }
        }
    }

    fn state(&self) -> PoolState {
        self.shared.lock().state
    }
}

/// A pool of worker threads consuming tasks from a shared bounded queue.
///
/// The pool exclusively owns its threads and queue: it is neither cloned
/// nor copied, and dropping it performs a graceful [`shutdown`].
///
/// # Examples
///
/// ```
/// use workpool::ThreadPool;
///
/// let pool = ThreadPool::fixed(2, 0).unwrap();
/// let handle = pool.submit_with_handle(|| 2 + 2).unwrap();
/// assert_eq!(handle.join().unwrap(), 4);
/// pool.shutdown();
/// ```
///
/// [`shutdown`]: ThreadPool::shutdown
pub struct ThreadPool {
    core: Arc<PoolCore>,
    monitor: Mutex<Option<Monitor>>,
}

impl ThreadPool {
    /// Creates a fixed-size pool of exactly `threads` workers.
    ///
    /// `max_queue_size` of `0` means an unbounded queue.
    pub fn fixed(threads: usize, max_queue_size: usize) -> Result<Self, ConfigError> {
        Self::with_config(PoolConfig::fixed(threads, max_queue_size))
    }

    /// Creates an adaptive pool bounded by `[min_threads, max_threads]`,
    /// rescaled by a monitor every `check_interval`.
    pub fn adaptive(
        min_threads: usize,
        max_threads: usize,
        max_queue_size: usize,
        check_interval: Duration,
    ) -> Result<Self, ConfigError> {
        Self::with_config(PoolConfig::adaptive(
            min_threads,
            max_threads,
            max_queue_size,
            check_interval,
        ))
    }

    /// Creates a pool from an explicit configuration.
    ///
    /// Fails fast with a [`ConfigError`] rather than degrading at runtime.
    pub fn with_config(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let core = Arc::new(PoolCore {
            queue: TaskQueue::new(config.max_queue_size),
            shared: SpinLock::new(PoolShared {
                state: PoolState::Running,
                live_workers: 0,
                retiring: 0,
                next_worker_id: 0,
            }),
            idle_workers: AtomicUsize::new(0),
            completed_tasks: AtomicUsize::new(0),
            failed_tasks: AtomicUsize::new(0),
            workers: Mutex::new(Vec::new()),
            config: config.clone(),
            stopped_latch: Mutex::new(false),
            stopped_cvar: Condvar::new(),
        });

        for _ in 0..config.min_threads {
            if !core.spawn_worker() {
                break;
            }
        }

        let monitor = config
            .check_interval
            .map(|interval| Monitor::start(Arc::clone(&core), interval));

        info!(
            min_threads = config.min_threads,
            max_threads = config.max_threads,
            max_queue_size = config.max_queue_size,
            adaptive = config.is_adaptive(),
            "pool started"
        );

        Ok(Self {
            core,
            monitor: Mutex::new(monitor),
        })
    }

    /// Submits a task, blocking while the queue is full.
    ///
    /// Fails with [`SubmitError::PoolClosed`] once the pool is draining or
    /// stopped, including when that happens while the caller is blocked
    /// waiting for queue space.
    pub fn submit<F>(&self, f: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.check_running()?;
        self.core.queue.push(Box::new(f))
    }

    /// Submits a task without blocking; fails with
    /// [`SubmitError::QueueFull`] when the bounded queue is at capacity.
    pub fn try_submit<F>(&self, f: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.check_running()?;
        self.core.queue.try_push(Box::new(f))
    }

    /// Submits a task, waiting at most `timeout` for queue space.
    pub fn submit_timeout<F>(&self, f: F, timeout: Duration) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.check_running()?;
        self.core.queue.push_timeout(Box::new(f), timeout)
    }

    /// Submits a value-returning task and hands back a [`TaskHandle`] for
    /// observing its outcome. Blocks like [`submit`](Self::submit) when the
    /// queue is full.
    pub fn submit_with_handle<T, F>(&self, f: F) -> Result<TaskHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.check_running()?;
        let (task, handle) = task::package(f);
        self.core.queue.push(task)?;
        Ok(handle)
    }

    fn check_running(&self) -> Result<(), SubmitError> {
        if self.core.state() != PoolState::Running {
            return Err(SubmitError::PoolClosed);
        }
        Ok(())
    }

    /// Gracefully stops the pool: rejects new submissions, lets queued and
    /// in-flight tasks finish, then joins every worker.
    ///
    /// Idempotent, and every caller blocks until the pool reaches
    /// `Stopped`, including callers racing a shutdown already in
    /// progress.
    pub fn shutdown(&self) {
        if !self.begin_drain() {
            self.wait_for_stopped();
            return;
        }
        self.core.queue.close();
        self.finish_shutdown();
    }

    /// Hard stop: still-queued tasks are discarded and never execute;
    /// in-flight tasks finish before their workers are joined.
    pub fn shutdown_now(&self) {
        if !self.begin_drain() {
            self.wait_for_stopped();
            return;
        }
        self.core.queue.close_and_discard();
        self.finish_shutdown();
    }

    /// Transitions Running → Draining and stops the monitor. Returns false
    /// if another call already moved the pool out of Running.
    fn begin_drain(&self) -> bool {
        {
            let mut shared = self.core.shared.lock();
            if shared.state != PoolState::Running {
                return false;
            }
            shared.state = PoolState::Draining;
        }
        info!("draining pool");
        // The monitor must stop before workers drain so it cannot respawn
        // or retire anything mid-shutdown.
        if let Some(monitor) = self.monitor.lock().unwrap().take() {
            monitor.stop();
        }
        true
    }

    /// Blocks until the winning shutdown call finishes the teardown; both
    /// `shutdown` variants return only once the pool is `Stopped`.
    fn wait_for_stopped(&self) {
        let mut stopped = self.core.stopped_latch.lock().unwrap();
        while !*stopped {
            stopped = self.core.stopped_cvar.wait(stopped).unwrap();
        }
    }

    fn finish_shutdown(&self) {
        let workers = std::mem::take(&mut *self.core.workers.lock().unwrap());
        for worker in workers {
            worker.join();
        }
        self.core.shared.lock().state = PoolState::Stopped;
        {
            let mut stopped = self.core.stopped_latch.lock().unwrap();
            *stopped = true;
        }
        self.core.stopped_cvar.notify_all();
        info!(
            completed_tasks = self.core.completed_tasks.load(Ordering::Relaxed),
            failed_tasks = self.core.failed_tasks.load(Ordering::Relaxed),
            "pool stopped"
        );
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        self.core.state()
    }

    /// Whether the pool still accepts submissions.
    pub fn is_running(&self) -> bool {
        self.state() == PoolState::Running
    }

    /// Number of tasks currently waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.core.queue.len()
    }

    /// Number of live worker threads.
    pub fn live_workers(&self) -> usize {
        self.core.shared.lock().live_workers
    }

    /// Point-in-time health snapshot.
    pub fn metrics(&self) -> PoolMetrics {
        let (live_workers, state) = {
            let shared = self.core.shared.lock();
            (shared.live_workers, shared.state)
        };
        PoolMetrics {
            live_workers,
            idle_workers: self.core.idle_workers.load(Ordering::Acquire),
            queue_depth: self.core.queue.len(),
            completed_tasks: self.core.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.core.failed_tasks.load(Ordering::Relaxed),
            state,
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let metrics = self.metrics();
        f.debug_struct("ThreadPool")
            .field("state", &metrics.state)
            .field("live_workers", &metrics.live_workers)
            .field("queue_depth", &metrics.queue_depth)
            .finish()
    }
}
