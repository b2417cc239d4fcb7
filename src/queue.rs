//! # Task Queue
//!
//! The single shared mutable resource between producers and workers: a
//! bounded (or unbounded) FIFO with blocking-queue discipline.
//!
//! ## Key Concepts
//! - One mutex guards the deque, the closed flag, and pending retirement
//!   requests, so producers, workers, and shutdown observe one consistent
//!   state
//! - Two condition variables: `not_empty` wakes consumers, `not_full` wakes
//!   producers; each dequeue wakes one blocked producer and each enqueue
//!   wakes one blocked consumer
//! - Capacity `0` means unbounded; producers never block
//!
//! Retirement requests ride on the same mutex: an idle worker claims one
//! only when no task is available, so a backlog is never abandoned and the
//! monitor never interrupts a worker mid-task.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::SubmitError;
use crate::task::Task;

/// Outcome of a worker's dequeue call.
pub(crate) enum Dequeued {
    /// A task to execute.
    Task(Task),
    /// The monitor asked one worker to retire; the claimant exits.
    Retire,
    /// The queue is closed and empty; the worker exits.
    Drained,
}

struct QueueInner {
    tasks: VecDeque<Task>,
    closed: bool,
    retire_requests: usize,
}

/// Blocking FIFO of pending tasks.
pub(crate) struct TaskQueue {
    inner: Mutex<QueueInner>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl TaskQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                tasks: VecDeque::new(),
                closed: false,
                retire_requests: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    fn is_full(&self, inner: &QueueInner) -> bool {
        self.capacity > 0 && inner.tasks.len() >= self.capacity
    }

    /// Enqueues a task, blocking while the queue is full.
    ///
    /// Fails with [`SubmitError::PoolClosed`] if the queue closes before
    /// space becomes available.
    pub(crate) fn push(&self, task: Task) -> Result<(), SubmitError> {
        let mut inner = self.inner.lock().unwrap();
        while self.is_full(&inner) && !inner.closed {
            inner = self.not_full.wait(inner).unwrap();
        }
        self.finish_push(inner, task)
    }

    /// Enqueues a task without blocking.
    pub(crate) fn try_push(&self, task: Task) -> Result<(), SubmitError> {
        let inner = self.inner.lock().unwrap();
        if !inner.closed && self.is_full(&inner) {
            return Err(SubmitError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.finish_push(inner, task)
    }

    /// Enqueues a task, blocking at most `timeout` for queue space.
    pub(crate) fn push_timeout(&self, task: Task, timeout: Duration) -> Result<(), SubmitError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        while self.is_full(&inner) && !inner.closed {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Err(SubmitError::Timeout(timeout));
            };
            let (guard, wait) = self.not_full.wait_timeout(inner, remaining).unwrap();
            inner = guard;
            if wait.timed_out() && self.is_full(&inner) && !inner.closed {
                return Err(SubmitError::Timeout(timeout));
            }
        }
        self.finish_push(inner, task)
    }

    fn finish_push(
        &self,
        mut inner: std::sync::MutexGuard<'_, QueueInner>,
        task: Task,
    ) -> Result<(), SubmitError> {
        if inner.closed {
            return Err(SubmitError::PoolClosed);
        }
        inner.tasks.push_back(task);
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeues the next unit of work, blocking while the queue is empty
    /// and still open.
    ///
    /// Tasks are always preferred over retirement claims; `Drained` is
    /// returned only once the queue is closed and empty.
    pub(crate) fn take(&self) -> Dequeued {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(task) = inner.tasks.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Dequeued::Task(task);
            }
            if inner.retire_requests > 0 {
                inner.retire_requests -= 1;
                return Dequeued::Retire;
            }
            if inner.closed {
                return Dequeued::Drained;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Closes the queue to producers and wakes every waiter. Pending tasks
    /// remain and will be drained by the workers.
    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        // Retirements are moot once the pool drains; every worker exits.
        inner.retire_requests = 0;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Closes the queue and discards still-pending tasks. Returns how many
    /// tasks were dropped without running.
    pub(crate) fn close_and_discard(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        inner.retire_requests = 0;
        let discarded = inner.tasks.len();
        inner.tasks.clear();
        drop(inner);
        if discarded > 0 {
            warn!(discarded, "discarding queued tasks on hard shutdown");
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
        discarded
    }

    /// Asks `count` idle workers to retire. Each request is claimed by one
    /// worker the next time it finds the queue empty.
    pub(crate) fn request_retirements(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        inner.retire_requests += count;
        drop(inner);
        self.not_empty.notify_all();
    }

    /// Withdraws retirement requests no worker has claimed yet.
    pub(crate) fn cancel_retirements(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        std::mem::take(&mut inner.retire_requests)
    }

    /// Retirement requests not yet claimed by a worker.
    pub(crate) fn pending_retirements(&self) -> usize {
        self.inner.lock().unwrap().retire_requests
    }

    /// Number of queued tasks. A snapshot; may be stale by the time it is
    /// used.
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn noop() -> Task {
        Box::new(|| {})
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = TaskQueue::new(0);
        let ran = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let ran = Arc::clone(&ran);
            queue
                .push(Box::new(move || ran.lock().unwrap().push(i)))
                .unwrap();
        }
        for _ in 0..5 {
            match queue.take() {
                Dequeued::Task(task) => task(),
                _ => panic!("expected a task"),
            }
        }
        assert_eq!(*ran.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn try_push_reports_full() {
        let queue = TaskQueue::new(1);
        queue.try_push(noop()).unwrap();
        assert_eq!(
            queue.try_push(noop()),
            Err(SubmitError::QueueFull { capacity: 1 })
        );
    }

    #[test]
    fn push_timeout_elapses_on_full_queue() {
        let queue = TaskQueue::new(1);
        queue.push(noop()).unwrap();
        let timeout = Duration::from_millis(50);
        let started = Instant::now();
        assert_eq!(
            queue.push_timeout(noop(), timeout),
            Err(SubmitError::Timeout(timeout))
        );
        assert!(started.elapsed() >= timeout);
    }

    #[test]
    fn close_rejects_later_pushes_but_keeps_tasks() {
        let queue = TaskQueue::new(0);
        queue.push(noop()).unwrap();
        queue.close();
        assert_eq!(queue.push(noop()), Err(SubmitError::PoolClosed));
        assert!(matches!(queue.take(), Dequeued::Task(_)));
        assert!(matches!(queue.take(), Dequeued::Drained));
    }

    #[test]
    fn close_and_discard_drops_pending_tasks() {
        let queue = TaskQueue::new(0);
        queue.push(noop()).unwrap();
        queue.push(noop()).unwrap();
        assert_eq!(queue.close_and_discard(), 2);
        assert!(matches!(queue.take(), Dequeued::Drained));
    }

    #[test]
    fn retirement_claimed_only_when_empty() {
        let queue = TaskQueue::new(0);
        queue.push(noop()).unwrap();
        queue.request_retirements(1);
        // Task first, retirement second.
        assert!(matches!(queue.take(), Dequeued::Task(_)));
        assert!(matches!(queue.take(), Dequeued::Retire));
        assert_eq!(queue.pending_retirements(), 0);
    }

    #[test]
    fn close_wakes_blocked_producer() {
        let queue = Arc::new(TaskQueue::new(1));
        queue.push(noop()).unwrap();

        let blocked = Arc::new(AtomicUsize::new(0));
        let producer = {
            let queue = Arc::clone(&queue);
            let blocked = Arc::clone(&blocked);
            thread::spawn(move || {
                blocked.store(1, Ordering::SeqCst);
                queue.push(Box::new(|| {}))
            })
        };

        while blocked.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(producer.join().unwrap(), Err(SubmitError::PoolClosed));
    }
}
