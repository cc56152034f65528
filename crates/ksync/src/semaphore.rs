//! Counting semaphore.
//!
//! A spinlock-protected permit counter plus an [`Event`]. A release with
//! waiters present hands the permit to the front waiter directly instead of
//! incrementing the counter, so a third thread's [`try_wait`] can never
//! steal a permit from the thread it was meant for.
//!
//! [`try_wait`]: Semaphore::try_wait

use crate::{
    cpu,
    event::Event,
    sched::Sched,
    spinlock::SpinLock,
};

pub struct Semaphore<S: Sched> {
    inner: SpinLock<SemInner<S>>,
}

struct SemInner<S: Sched> {
    /// Permits available for immediate grab. Never goes negative; waiters
    /// are tracked by the queue, not by the counter.
    count: usize,
    queue: Event<S>,
}

impl<S: Sched> Semaphore<S> {
    /// Creates a semaphore holding `permits` initial permits.
    pub const fn new(permits: usize) -> Self {
        Semaphore {
            inner: SpinLock::new(SemInner {
                count: permits,
                queue: Event::new(),
            }),
        }
    }

    /// Takes a permit if one is available right now.
    pub fn try_wait(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.count > 0 {
            inner.count -= 1;
            true
        } else {
            false
        }
    }

    /// Takes a permit, suspending until one is granted.
    ///
    /// A signal grants the permit by removing this thread from the
    /// listener list without touching the counter, so waking up while
    /// still listed is spurious and just means waiting again.
    pub fn wait(&self) {
        let me = match cpu::current_thread() {
            Some(tid) => tid,
            None => crate::misuse("semaphore: wait with no current thread"),
        };
        let mut inner = self.inner.lock();
        if inner.count > 0 {
            inner.count -= 1;
            return;
        }
        inner.queue.listen();
        loop {
            drop(inner);
            Event::<S>::suspend();
            inner = self.inner.lock();
            if !inner.queue.contains(me) {
                return;
            }
        }
    }

    /// Releases a permit.
    ///
    /// Hands it to the longest-waiting thread if there is one, otherwise
    /// banks it on the counter.
    pub fn signal(&self) {
        let mut inner = self.inner.lock();
        if inner.queue.trigger().is_none() {
            inner.count += 1;
        }
    }

    /// Permits currently banked. Stale immediately; diagnostic only.
    pub fn permits(&self) -> usize {
        self.inner.lock().count
    }
}
