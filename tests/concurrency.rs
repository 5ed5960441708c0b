//! End-to-end multi-thread exercises for the three blocking primitives.
//! Unlike the unit tests in each module (which check single-operation
//! semantics, often with a scoped thread or two), these spawn real OS
//! thread pools and run them to completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use afl_locks::{Mutex, Once, RecursiveMutex};

#[test]
fn mutex_survives_high_contention() {
    const THREADS: usize = 64;
    const ITERS: usize = 10_000;

    let mutex = Mutex::new();
    let counter = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ITERS {
                    mutex.lock();
                    counter.fetch_add(1, Ordering::Relaxed);
                    mutex.unlock();
                }
            });
        }
    });

    assert_eq!(counter.load(Ordering::Relaxed), THREADS * ITERS);
}

#[test]
fn recursive_mutex_survives_deep_single_thread_nesting() {
    const DEPTH: usize = 20;

    fn recurse(m: &RecursiveMutex, depth: usize) {
        if depth == 0 {
            return;
        }
        m.lock().unwrap();
        recurse(m, depth - 1);
        m.unlock().unwrap();
    }

    let mutex = RecursiveMutex::new();
    recurse(&mutex, DEPTH);

    mutex.lock().unwrap();
    mutex.unlock().unwrap();
}

#[test]
fn once_runs_exactly_once_under_concurrent_callers() {
    const THREADS: usize = 100;

    let once = Once::new();
    let counter = AtomicUsize::new(0);
    let successes = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                once.call_once(|| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
                successes.fetch_add(1, Ordering::Relaxed);
            });
        }
    });

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(successes.load(Ordering::Relaxed), THREADS);
    assert!(once.is_completed());
}
