//! Blocking mutex behavior on real host threads (LibOS mode).

mod common;

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::{assert_blocked, assert_soon};
use ksync::{host, HostSched, Mutex};

type KMutex = Mutex<HostSched>;

struct Shared(UnsafeCell<usize>);

// Guarded by the mutex under test.
unsafe impl Sync for Shared {}

#[test]
fn recursive_depth_matches_unlocks() {
    let _reg = host::register_current();
    let mutex = KMutex::recursive();

    mutex.lock();
    mutex.lock();
    mutex.lock();
    assert!(mutex.held_by_current());

    mutex.unlock();
    mutex.unlock();
    // Two of three unlocks done: still owned.
    assert!(mutex.is_locked());

    mutex.unlock();
    assert!(!mutex.is_locked());
    assert!(!mutex.held_by_current());
}

#[test]
fn try_lock_reenters_only_when_recursive() {
    let _reg = host::register_current();

    let recursive = KMutex::recursive();
    assert!(recursive.try_lock());
    assert!(recursive.try_lock());
    recursive.unlock();
    recursive.unlock();

    let plain = KMutex::new();
    assert!(plain.try_lock());
    assert!(!plain.try_lock());
    plain.unlock();
}

#[test]
fn try_lock_fails_while_owned_elsewhere() {
    let _reg = host::register_current();
    let mutex = Arc::new(KMutex::new());
    mutex.lock();

    let contender = Arc::clone(&mutex);
    thread::spawn(move || {
        let _reg = host::register_current();
        assert!(!contender.try_lock());
        assert!(!contender.held_by_current());
    })
    .join()
    .unwrap();

    mutex.unlock();

    let taker = Arc::clone(&mutex);
    thread::spawn(move || {
        let _reg = host::register_current();
        assert!(taker.try_lock());
        taker.unlock();
    })
    .join()
    .unwrap();
}

#[test]
fn waiter_wakes_only_after_final_unlock() {
    let _reg = host::register_current();
    let mutex = Arc::new(KMutex::recursive());
    let acquired = Arc::new(AtomicBool::new(false));

    mutex.lock();
    mutex.lock();

    let waiter = {
        let mutex = Arc::clone(&mutex);
        let acquired = Arc::clone(&acquired);
        thread::spawn(move || {
            let _reg = host::register_current();
            mutex.lock();
            acquired.store(true, Ordering::SeqCst);
            mutex.unlock();
        })
    };

    assert_blocked("waiter got the mutex at depth 2", || {
        acquired.load(Ordering::SeqCst)
    });

    mutex.unlock();
    assert_blocked("waiter got the mutex at depth 1", || {
        acquired.load(Ordering::SeqCst)
    });

    mutex.unlock();
    assert_soon("waiter to take the mutex after the final unlock", || {
        acquired.load(Ordering::SeqCst)
    });
    waiter.join().unwrap();
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    const THREADS: usize = 8;
    const ITERS: usize = 1_000;

    let mutex = Arc::new(KMutex::new());
    let shared = Arc::new(Shared(UnsafeCell::new(0)));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let mutex = Arc::clone(&mutex);
            let shared = Arc::clone(&shared);
            let in_cs = Arc::clone(&in_cs);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let _reg = host::register_current();
                start.wait();
                for _ in 0..ITERS {
                    mutex.lock();
                    assert_eq!(in_cs.fetch_add(1, Ordering::SeqCst), 0);
                    unsafe { *shared.0.get() += 1 };
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                    mutex.unlock();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let _reg = host::register_current();
    mutex.lock();
    assert_eq!(unsafe { *shared.0.get() }, THREADS * ITERS);
    mutex.unlock();
}

#[test]
fn unlock_by_non_owner_panics() {
    let _reg = host::register_current();
    let mutex = Arc::new(KMutex::new());
    mutex.lock();

    let intruder = Arc::clone(&mutex);
    let result = thread::spawn(move || {
        let _reg = host::register_current();
        intruder.unlock();
    })
    .join();
    assert!(result.is_err(), "non-owner unlock must panic");

    mutex.unlock();
}

#[test]
fn relocking_a_plain_mutex_panics() {
    let result = thread::spawn(|| {
        let _reg = host::register_current();
        let mutex = KMutex::new();
        mutex.lock();
        mutex.lock();
    })
    .join();
    assert!(result.is_err(), "owner relock of a plain mutex must panic");
}
