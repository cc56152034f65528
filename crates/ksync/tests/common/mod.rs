//! Shared helpers for the LibOS-mode concurrency tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Polls `cond` until it holds, failing the test after a bounded wait so a
/// regression shows up as a failure instead of a hung test binary.
pub fn assert_soon(what: &str, cond: impl Fn() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < TIMEOUT, "timed out waiting for {what}");
        std::thread::yield_now();
    }
}

/// Asserts `cond` stays false over a short observation window; used to
/// check that a thread is (still) blocked.
pub fn assert_blocked(what: &str, cond: impl Fn() -> bool) {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(200) {
        assert!(!cond(), "{what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}
