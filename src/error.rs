use std::time::Duration;
use thiserror::Error;

/// Errors detected while validating a [`PoolConfig`](crate::PoolConfig).
///
/// Misconfiguration fails at construction; a pool is never built in a
/// degraded shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_threads must be greater than 0")]
    ZeroMaxThreads,
    #[error("min_threads ({min}) exceeds max_threads ({max})")]
    InvalidThreadBounds { min: usize, max: usize },
    #[error("check_interval must be greater than zero")]
    ZeroCheckInterval,
    #[error("fixed-size pool requires min_threads == max_threads (got {min} and {max})")]
    FixedPoolBounds { min: usize, max: usize },
}

/// Errors returned when submitting a task to the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The queue is at capacity and the caller asked not to block.
    #[error("task queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },
    /// The pool is draining or stopped and no longer accepts work.
    #[error("pool is closed")]
    PoolClosed,
    /// The bounded wait for queue space elapsed.
    #[error("timed out waiting for queue space after {0:?}")]
    Timeout(Duration),
}

/// Errors observed through a [`TaskHandle`](crate::TaskHandle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// The task ran and panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The pool was torn down before the task ever ran.
    #[error("task was discarded before execution")]
    Discarded,
}
