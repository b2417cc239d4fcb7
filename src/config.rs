//! # Pool Configuration
//!
//! Construction-time knobs for the pool, validated eagerly so a pool is
//! never built in a shape it cannot run.
//!
//! ## Key Concepts
//! - `min_threads`/`max_threads` bound the worker set; equal bounds with
//!   no `check_interval` select fixed mode
//! - `max_queue_size` of `0` means an unbounded queue
//! - `Default` targets the host: `max_threads` from the CPU count, an
//!   unbounded queue, and a one-second monitor tick

use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for a [`ThreadPool`](crate::ThreadPool).
///
/// Two shapes are supported:
/// - **Fixed**: `check_interval` is `None` and `min_threads == max_threads`;
///   the worker set is created at construction and never resized.
/// - **Adaptive**: `check_interval` is `Some(_)`; a monitor thread rescales
///   the worker set between `min_threads` and `max_threads` on every tick.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Lower bound on live workers; also the number spawned at construction.
    pub min_threads: usize,

    /// Upper bound on live workers.
    pub max_threads: usize,

    /// Capacity of the task queue. `0` means unbounded, and producers
    /// never block on submission.
    pub max_queue_size: usize,

    /// Interval between monitor ticks. `None` selects fixed mode.
    pub check_interval: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_threads: 0,
            max_threads: num_cpus::get(),
            max_queue_size: 0,
            check_interval: Some(Duration::from_secs(1)),
        }
    }
}

impl PoolConfig {
    /// Configuration for a fixed-size pool of exactly `threads` workers.
    pub fn fixed(threads: usize, max_queue_size: usize) -> Self {
        Self {
            min_threads: threads,
            max_threads: threads,
            max_queue_size,
            check_interval: None,
        }
    }

    /// Configuration for an adaptive pool bounded by `[min_threads, max_threads]`.
    pub fn adaptive(
        min_threads: usize,
        max_threads: usize,
        max_queue_size: usize,
        check_interval: Duration,
    ) -> Self {
        Self {
            min_threads,
            max_threads,
            max_queue_size,
            check_interval: Some(check_interval),
        }
    }

    /// Checks the configuration, failing fast on shapes the pool cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(ConfigError::ZeroMaxThreads);
        }
        if self.min_threads > self.max_threads {
            return Err(ConfigError::InvalidThreadBounds {
                min: self.min_threads,
                max: self.max_threads,
            });
        }
        match self.check_interval {
            Some(interval) if interval.is_zero() => Err(ConfigError::ZeroCheckInterval),
            // Without a monitor nothing can ever resize the worker set.
            None if self.min_threads != self.max_threads => Err(ConfigError::FixedPoolBounds {
                min: self.min_threads,
                max: self.max_threads,
            }),
            _ => Ok(()),
        }
    }

    /// Whether this configuration runs a monitor thread.
    pub fn is_adaptive(&self) -> bool {
        self.check_interval.is_some()
    }
}
