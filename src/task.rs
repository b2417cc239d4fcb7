use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

use crate::error::JoinError;

/// A unit of work owned by the queue until a worker takes it for execution.
///
/// A task signals failure by panicking; the worker boundary catches the
/// panic, reports it, and moves on to the next task.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Receiving side of a value-returning submission.
///
/// Returned by [`ThreadPool::submit_with_handle`](crate::ThreadPool::submit_with_handle).
/// Dropping the handle is fine; the task still runs.
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<Result<T, JoinError>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has finished and returns its outcome.
    ///
    /// Returns [`JoinError::Panicked`] if the task panicked and
    /// [`JoinError::Discarded`] if the pool dropped the task before it ran.
    pub fn join(self) -> Result<T, JoinError> {
        self.receiver.recv().unwrap_or(Err(JoinError::Discarded))
    }

    /// Non-blocking poll of the outcome. `None` means still pending.
    pub fn try_join(&self) -> Option<Result<T, JoinError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(JoinError::Discarded)),
        }
    }
}

/// Wraps a value-returning closure into a queueable [`Task`] plus the
/// handle observing its outcome.
///
/// A panic is reported to the handle first and then resumed, so the worker
/// boundary still sees (and counts) the failure exactly once.
pub(crate) fn package<T, F>(f: F) -> (Task, TaskHandle<T>)
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    let task: Task = Box::new(move || {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => {
                // The handle may have been dropped; the result is discarded.
                let _ = sender.send(Ok(value));
            }
            Err(payload) => {
                let _ = sender.send(Err(JoinError::Panicked(panic_message(payload.as_ref()))));
                panic::resume_unwind(payload);
            }
        }
    });
    (task, TaskHandle { receiver })
}

/// Best-effort extraction of a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_observes_value() {
        let (task, handle) = package(|| 41 + 1);
        task();
        assert_eq!(handle.join(), Ok(42));
    }

    #[test]
    fn handle_observes_panic_message() {
        let (task, handle) = package(|| -> () { panic!("boom") });
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        assert!(outcome.is_err());
        assert_eq!(handle.join(), Err(JoinError::Panicked("boom".to_string())));
    }

    #[test]
    fn dropped_task_reports_discarded() {
        let (task, handle) = package(|| 7);
        drop(task);
        assert_eq!(handle.join(), Err(JoinError::Discarded));
    }

    #[test]
    fn try_join_is_pending_until_run() {
        let (task, handle) = package(|| "done");
        assert!(handle.try_join().is_none());
        task();
        assert_eq!(handle.try_join(), Some(Ok("done")));
    }
}
