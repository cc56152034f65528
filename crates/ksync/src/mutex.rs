//! Ownership-tracked blocking mutex, recursive on request.
//!
//! One concrete type serves both the plain and the re-entrant use case,
//! selected at construction. Because a re-entrant lock can be held several
//! times by the same thread, the API is explicit [`lock`]/[`unlock`]
//! operations rather than a data-wrapping RAII guard: handing out a second
//! aliasing `&mut` for the re-entrant acquisition would be unsound.
//!
//! [`lock`]: Mutex::lock
//! [`unlock`]: Mutex::unlock

use crate::{
    cpu,
    event::Event,
    sched::{Sched, ThreadId},
    spinlock::SpinLock,
};

pub struct Mutex<S: Sched> {
    inner: SpinLock<MutexInner<S>>,
}

struct MutexInner<S: Sched> {
    /// Thread allowed to re-acquire and required to release. `None` iff
    /// `depth == 0`.
    owner: Option<ThreadId>,
    depth: u32,
    recursive: bool,
    queue: Event<S>,
}

impl<S: Sched> Mutex<S> {
    /// Creates a mutex that treats re-acquisition by its owner as misuse.
    pub const fn new() -> Self {
        Self::with_recursion(false)
    }

    /// Creates a mutex the owning thread may re-acquire; every `lock`
    /// must be matched by an `unlock` before the mutex is free again.
    pub const fn recursive() -> Self {
        Self::with_recursion(true)
    }

    const fn with_recursion(recursive: bool) -> Self {
        Mutex {
            inner: SpinLock::new(MutexInner {
                owner: None,
                depth: 0,
                recursive,
                queue: Event::new(),
            }),
        }
    }

    /// Acquires the mutex, suspending while another thread owns it.
    pub fn lock(&self) {
        let me = match cpu::current_thread() {
            Some(tid) => tid,
            None => crate::misuse("mutex: lock with no current thread"),
        };
        let mut inner = self.inner.lock();
        loop {
            match inner.owner {
                None => {
                    // We may still be listed if we were woken and beaten to
                    // the lock, or grabbed it on a spurious wake. Leaving a
                    // stale entry would swallow a later trigger.
                    inner.queue.remove(me);
                    inner.owner = Some(me);
                    inner.depth = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    if !inner.recursive {
                        crate::misuse("mutex: relocked by its owner");
                    }
                    inner.depth += 1;
                    return;
                }
                Some(_) => {
                    if !inner.queue.contains(me) {
                        inner.queue.listen();
                    }
                    drop(inner);
                    Event::<S>::suspend();
                    inner = self.inner.lock();
                }
            }
        }
    }

    /// Acquires the mutex only if that cannot block.
    ///
    /// Fails when another thread owns it, and also when the caller already
    /// owns a non-recursive instance.
    pub fn try_lock(&self) -> bool {
        let me = match cpu::current_thread() {
            Some(tid) => tid,
            None => crate::misuse("mutex: lock with no current thread"),
        };
        let mut inner = self.inner.lock();
        match inner.owner {
            None => {
                inner.owner = Some(me);
                inner.depth = 1;
                true
            }
            Some(owner) if owner == me && inner.recursive => {
                inner.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Releases one level of ownership.
    ///
    /// Unlocking a mutex the caller does not own is a fatal caller-side
    /// bug. The front waiter is woken once the depth returns to zero.
    pub fn unlock(&self) {
        let me = cpu::current_thread();
        let mut inner = self.inner.lock();
        if me.is_none() || inner.owner != me {
            crate::misuse("mutex: unlocked by a thread that does not own it");
        }
        inner.depth -= 1;
        if inner.depth == 0 {
            inner.owner = None;
            inner.queue.trigger();
        }
    }

    /// Whether any thread owns the mutex. Stale immediately.
    pub fn is_locked(&self) -> bool {
        self.inner.lock().owner.is_some()
    }

    /// Whether the calling thread owns the mutex.
    pub fn held_by_current(&self) -> bool {
        let me = cpu::current_thread();
        me.is_some() && self.inner.lock().owner == me
    }
}

impl<S: Sched> Default for Mutex<S> {
    fn default() -> Self {
        Self::new()
    }
}
