//! Adaptive-mode behavior: monitor-driven scale-up and scale-down within
//! the configured bounds.


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use test_helpers::{Gate, init_tracing, wait_until};
use workpool::{PoolState, SubmitError, ThreadPool};

const TICK: Duration = Duration::from_millis(50);

#[test]
fn scales_up_under_load_and_back_down_when_idle() {
    init_tracing();
    let pool = ThreadPool::adaptive(1, 4, 0, TICK).unwrap();
    assert_eq!(pool.live_workers(), 1);

    let gate = Gate::closed();
    for _ in 0..20 {
        let gate = gate.clone();
        pool.submit(move || gate.wait()).unwrap();
    }

    // Backlog over idle workers: the monitor should reach the maximum.
    assert!(wait_until(Duration::from_secs(5), || pool.live_workers() == 4));

    gate.open();
    assert!(wait_until(Duration::from_secs(5), || {
        pool.metrics().completed_tasks == 20
    }));

    // Idle workers past the tick: settle back at the minimum.
    assert!(wait_until(Duration::from_secs(5), || pool.live_workers() == 1));
    pool.shutdown();
}

#[test]
fn live_workers_stay_within_bounds_under_bursty_load() {
    init_tracing();
    let pool = ThreadPool::adaptive(2, 3, 0, Duration::from_millis(25)).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for burst in 0..5 {
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                std::thread::sleep(Duration::from_millis(2));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        // Sample the invariant while the monitor reacts to the burst.
        for _ in 0..20 {
            let live = pool.live_workers();
            assert!(
                (2..=3).contains(&live),
                "burst {burst}: live worker count {live} left bounds [2, 3]"
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    assert!(wait_until(Duration::from_secs(5), || {
        counter.load(Ordering::SeqCst) == 50
    }));
    pool.shutdown();
}

#[test]
fn min_zero_pool_spawns_on_demand() {
    init_tracing();
    let pool = ThreadPool::adaptive(0, 2, 0, Duration::from_millis(25)).unwrap();
    assert_eq!(pool.live_workers(), 0);

    let handle = pool.submit_with_handle(|| "ran").unwrap();
    assert_eq!(handle.join(), Ok("ran"));

    // With nothing queued the pool drains back to zero workers.
    assert!(wait_until(Duration::from_secs(5), || pool.live_workers() == 0));
    pool.shutdown();
}

#[test]
fn retirement_never_interrupts_in_flight_tasks() {
    init_tracing();
    let pool = ThreadPool::adaptive(1, 4, 0, Duration::from_millis(25)).unwrap();
    let finished = Arc::new(AtomicUsize::new(0));

    // Long tasks outlive several monitor ticks; every one must complete.
    for _ in 0..8 {
        let finished = Arc::clone(&finished);
        pool.submit(move || {
            std::thread::sleep(Duration::from_millis(120));
            finished.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    assert!(wait_until(Duration::from_secs(10), || {
        finished.load(Ordering::SeqCst) == 8
    }));
    assert_eq!(pool.metrics().failed_tasks, 0);
    pool.shutdown();
}

#[test]
fn shutdown_stops_monitor_and_rejects_submissions() {
    init_tracing();
    let pool = ThreadPool::adaptive(1, 4, 0, TICK).unwrap();
    pool.shutdown();

    assert_eq!(pool.metrics().state, PoolState::Stopped);
    assert_eq!(pool.live_workers(), 0);
    assert_eq!(pool.submit(|| {}), Err(SubmitError::PoolClosed));

    // A second shutdown after the monitor is gone must stay a no-op.
    pool.shutdown();
    assert_eq!(pool.metrics().state, PoolState::Stopped);
}
