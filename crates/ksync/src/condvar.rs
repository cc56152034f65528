//! Condition variable coupled to an external [`Mutex`].
//!
//! Holds no domain state of its own; whether the guarded predicate
//! actually holds is entirely the caller's business, so every wait belongs
//! inside a loop re-checking it:
//!
//! ```text
//! mutex.lock();
//! while !predicate() {
//!     condvar.wait(&mutex);
//! }
//! ...
//! mutex.unlock();
//! ```

use crate::{
    cpu,
    event::Event,
    mutex::Mutex,
    sched::Sched,
    spinlock::SpinLock,
};

pub struct Condvar<S: Sched> {
    inner: SpinLock<Event<S>>,
}

impl<S: Sched> Condvar<S> {
    pub const fn new() -> Self {
        Condvar {
            inner: SpinLock::new(Event::new()),
        }
    }

    /// Atomically releases `mutex` and suspends until notified.
    ///
    /// The caller must own `mutex`, and a recursive mutex must be held at
    /// depth one, since only a single level of ownership is released here.
    /// Registration happens before the mutex is released, and a
    /// notification arriving between the release and the park is held as a
    /// pending wake by the scheduler, so the window cannot lose a wakeup.
    /// The mutex is owned again when this returns; the predicate may no
    /// longer hold.
    pub fn wait(&self, mutex: &Mutex<S>) {
        let me = match cpu::current_thread() {
            Some(tid) => tid,
            None => crate::misuse("condvar: wait with no current thread"),
        };
        if !mutex.held_by_current() {
            crate::misuse("condvar: wait without owning the mutex");
        }

        let mut queue = self.inner.lock();
        queue.listen();
        drop(queue);

        mutex.unlock();
        Event::<S>::suspend();

        // A spurious resume leaves the registration behind; a stale entry
        // would soak up a later notify_one meant for a real waiter.
        let mut queue = self.inner.lock();
        queue.remove(me);
        drop(queue);

        mutex.lock();
    }

    /// Wakes the longest-waiting thread, if any.
    pub fn notify_one(&self) {
        self.inner.lock().trigger();
    }

    /// Wakes every thread registered at the time of the call. Threads that
    /// start waiting afterwards are unaffected.
    pub fn notify_all(&self) {
        self.inner.lock().trigger_all();
    }

    /// Whether any thread is currently registered. Stale immediately.
    pub fn has_waiters(&self) -> bool {
        !self.inner.lock().is_empty()
    }
}

impl<S: Sched> Default for Condvar<S> {
    fn default() -> Self {
        Self::new()
    }
}
