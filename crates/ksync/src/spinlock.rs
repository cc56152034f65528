//! Busy-wait mutual exclusion.
//!
//! The substrate every other primitive in this crate is built on. Waiters
//! hammer an atomic flag until it becomes free; there is no queueing and no
//! fairness guarantee. Interrupts are disabled on the local core for the
//! whole held duration so that a handler cannot spin on a lock its own
//! thread already holds.

use core::{
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::cpu::{pop_off, push_off};

/// A spin lock providing mutually exclusive access to data.
///
/// Must never be held across an operation that can block: a core spinning
/// on a lock whose holder has been switched out deadlocks the kernel. The
/// blocking primitives assert this before suspending.
pub struct SpinLock<T: ?Sized> {
    held: AtomicBool,
    data: UnsafeCell<T>,
}

/// A guard granting access to the data behind a [`SpinLock`].
///
/// The lock is released when the guard falls out of scope.
pub struct SpinLockGuard<'a, T: ?Sized + 'a> {
    held: &'a AtomicBool,
    data: &'a mut T,
}

// Same unsafe impls as `std::sync::Mutex`.
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}
unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates a new unlocked [`SpinLock`] wrapping the supplied data.
    pub const fn new(data: T) -> Self {
        SpinLock {
            held: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Consumes the lock and returns the underlying data.
    pub fn into_inner(self) -> T {
        // Statically exclusive: no guards can be outstanding.
        self.data.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// Acquires the lock, spinning until it is free.
    ///
    /// Local interrupts stay disabled until the returned guard is dropped.
    pub fn lock(&self) -> SpinLockGuard<T> {
        push_off();
        // compare_exchange_weak may fail spuriously; combined with the
        // read-only inner loop it keeps the cache line shared while the
        // lock is held by someone else.
        while self
            .held
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.is_locked() {
                core::hint::spin_loop();
            }
        }

        SpinLockGuard {
            held: &self.held,
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// Acquires the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<SpinLockGuard<T>> {
        push_off();
        if self
            .held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SpinLockGuard {
                held: &self.held,
                data: unsafe { &mut *self.data.get() },
            })
        } else {
            pop_off();
            None
        }
    }

    /// Whether the lock is currently held by anyone.
    ///
    /// The answer is stale the moment it is produced; useful as a
    /// heuristic, never for synchronization.
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    /// Mutable access without locking.
    ///
    /// The exclusive borrow of `self` already guarantees no guard exists.
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("data", &&*guard).finish(),
            None => f.write_str("SpinLock { <locked> }"),
        }
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for SpinLock<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<'a, T: ?Sized + fmt::Debug> fmt::Debug for SpinLockGuard<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<'a, T: ?Sized> Deref for SpinLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.data
    }
}

impl<'a, T: ?Sized> DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<'a, T: ?Sized> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
        pop_off();
    }
}
