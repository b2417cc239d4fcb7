//! # Worker Thread Implementation
//!
//! An individual worker in the pool. Each worker runs one OS thread that
//! repeatedly dequeues and executes tasks until the queue reports drain or
//! hands it a retirement claim.
//!
//! ## Key Responsibilities
//! - Dequeue → execute → repeat
//! - Error isolation: a panicking task is caught, reported, and counted;
//!   it never terminates the worker thread
//! - Cooperative termination: an in-flight task always finishes before a
//!   stop or retirement is honored

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use tracing::{debug, error};

use crate::pool::PoolCore;
use crate::queue::Dequeued;
use crate::task::panic_message;

/// Why a worker's run loop ended.
#[derive(Debug, Clone, Copy)]
enum ExitReason {
    /// Claimed a retirement request from the monitor.
    Retired,
    /// The queue was closed and fully drained.
    Drained,
}

/// Handle to one worker thread.
pub(crate) struct Worker {
    id: usize,
    handle: thread::JoinHandle<()>,
}

impl Worker {
    /// Spawns a named worker thread running the dequeue/execute loop.
    pub(crate) fn spawn(id: usize, core: Arc<PoolCore>) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("workpool-worker-{id}"))
            .spawn(move || run(&core, id))?;
        Ok(Self { id, handle })
    }

    /// Whether the underlying thread has finished; used by the monitor to
    /// reap retired workers without blocking.
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub(crate) fn join(self) {
        if self.handle.join().is_err() {
            // Unreachable in practice: the run loop catches task panics.
            error!(worker_id = self.id, "worker thread panicked");
        }
    }
}

/// Worker main loop.
///
/// The idle counter brackets the dequeue call: a worker counts as idle
/// exactly while it is not executing a task.
fn run(core: &Arc<PoolCore>, id: usize) {
    debug!(worker_id = id, "worker started");

    let reason = loop {
        core.idle_workers.fetch_add(1, Ordering::Release);
        let next = core.queue.take();
        core.idle_workers.fetch_sub(1, Ordering::Release);

        match next {
            Dequeued::Task(task) => match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(()) => {
                    core.completed_tasks.fetch_add(1, Ordering::Relaxed);
                }
                Err(payload) => {
                    core.failed_tasks.fetch_add(1, Ordering::Relaxed);
                    error!(
                        worker_id = id,
                        panic = %panic_message(payload.as_ref()),
                        "task panicked; worker continues"
                    );
                }
            },
            Dequeued::Retire => break ExitReason::Retired,
            Dequeued::Drained => break ExitReason::Drained,
        }
    };

    {
        let mut shared = core.shared.lock();
        shared.live_workers -= 1;
        if matches!(reason, ExitReason::Retired) {
            shared.retiring -= 1;
        }
    }
    debug!(worker_id = id, reason = ?reason, "worker exited");
}
