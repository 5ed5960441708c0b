//! Uncontended fast-path micro-benchmarks, standing in for a hand-rolled
//! timing loop: Criterion's own statistics handle the min/max/variance
//! bookkeeping instead.

use criterion::{criterion_group, criterion_main, Criterion};

use afl_locks::{Mutex, Once, OwnedMutex, RecursiveMutex, SpinLock};

fn spinlock_round_trip(c: &mut Criterion) {
    let lock = SpinLock::new();
    c.bench_function("spinlock uncontended lock/unlock", |b| {
        b.iter(|| {
            lock.lock();
            lock.unlock();
        })
    });
}

fn mutex_round_trip(c: &mut Criterion) {
    let mutex = Mutex::new();
    c.bench_function("mutex uncontended lock/unlock", |b| {
        b.iter(|| {
            mutex.lock();
            mutex.unlock();
        })
    });
}

fn owned_mutex_round_trip(c: &mut Criterion) {
    let mutex = OwnedMutex::new();
    c.bench_function("owned mutex uncontended lock/unlock", |b| {
        b.iter(|| {
            mutex.lock().unwrap();
            mutex.unlock().unwrap();
        })
    });
}

fn recursive_mutex_round_trip(c: &mut Criterion) {
    let mutex = RecursiveMutex::new();
    c.bench_function("recursive mutex uncontended lock/unlock", |b| {
        b.iter(|| {
            mutex.lock().unwrap();
            mutex.unlock().unwrap();
        })
    });
}

fn once_completed_check(c: &mut Criterion) {
    let once = Once::new();
    once.call_once(|| {});
    c.bench_function("once post-completion check", |b| {
        b.iter(|| once.call_once(|| {}))
    });
}

criterion_group!(
    benches,
    spinlock_round_trip,
    mutex_round_trip,
    owned_mutex_round_trip,
    recursive_mutex_round_trip,
    once_completed_check,
);
criterion_main!(benches);
