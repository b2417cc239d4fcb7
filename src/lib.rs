//! # workpool
//!
//! A worker pool over OS threads with two modes: a fixed-size pool and an
//! adaptive pool whose worker count is rescaled by a periodic monitor.
//!
//! ## Key Concepts
//! - **Bounded task queue**: FIFO with blocking enqueue when full
//!   (backpressure) and blocking dequeue when empty; capacity `0` means
//!   unbounded
//! - **Workers**: OS threads draining the queue; a failing (panicking)
//!   task is isolated at the worker boundary and never kills the thread
//! - **Monitor**: in adaptive mode, a periodic controller keeps the live
//!   worker count within `[min_threads, max_threads]` based on queue depth
//!   and idle workers
//! - **Graceful shutdown**: Running → Draining → Stopped; queued and
//!   in-flight work completes and every thread is joined
//!
//! ## Design Principles
//! - Blocking-queue discipline (mutex + condvars) for producer/worker
//!   rendezvous; no busy-waiting while idle
//! - A dedicated [`SpinLock`] guards only the worker-count and state
//!   fields, held for O(1) updates
//! - Failures surface as typed errors ([`SubmitError`], [`ConfigError`],
//!   [`JoinError`]) and `tracing` events, never process aborts
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use workpool::ThreadPool;
//!
//! // Adaptive pool: 1..=4 workers, unbounded queue, 100ms monitor tick.
//! let pool = ThreadPool::adaptive(1, 4, 0, Duration::from_millis(100)).unwrap();
//! pool.submit(|| println!("hello from a worker")).unwrap();
//! pool.shutdown();
//! ```

pub mod config;
pub mod error;
pub mod pool;
pub mod spin;
pub mod task;

mod monitor;
mod queue;
mod worker;

// Re-export key types for easier usage
pub use config::PoolConfig;
pub use error::{ConfigError, JoinError, SubmitError};
pub use pool::{PoolMetrics, PoolState, ThreadPool};
pub use spin::{SpinGuard, SpinLock};
pub use task::{Task, TaskHandle};
