//! The wait/wake engine.
//!
//! An [`Event`] is the listener list a blocking primitive embeds next to
//! its own state, behind its own spinlock. The list itself is not
//! thread-safe: every call that touches it must happen with the embedding
//! primitive's spinlock held. Suspension is the one exception: the lock
//! has to be dropped first, and the scheduler's wake token covers the gap
//! between the unlock and the switch-out.
//!
//! A blocking operation therefore looks like:
//!
//! ```text
//! lock the primitive's spinlock
//! loop {
//!     condition holds  ->  done
//!     listen()                    (register, still under the lock)
//!     drop the guard              (interrupts come back on)
//!     Event::<S>::suspend()       (park; may wake spuriously)
//!     re-lock and re-validate
//! }
//! ```
//!
//! Wakes make no promise about the condition still holding; every waiter
//! re-validates after `suspend` returns.

use alloc::collections::VecDeque;
use core::marker::PhantomData;

use log::trace;

use crate::{
    cpu,
    sched::{Sched, ThreadId},
};

/// An ordered collection of threads waiting to be resumed.
///
/// Listeners wake in registration order. A thread may sit on at most one
/// event's list at a time.
pub struct Event<S: Sched> {
    listeners: VecDeque<ThreadId>,
    _sched: PhantomData<S>,
}

impl<S: Sched> Event<S> {
    pub const fn new() -> Self {
        Event {
            listeners: VecDeque::new(),
            _sched: PhantomData,
        }
    }

    /// Registers the current thread at the back of the list.
    ///
    /// Caller holds the embedding primitive's spinlock and must not
    /// register a thread that is already listed.
    pub fn listen(&mut self) {
        let tid = match cpu::current_thread() {
            Some(tid) => tid,
            None => crate::misuse("event: listen with no current thread"),
        };
        debug_assert!(!self.listeners.contains(&tid));
        self.listeners.push_back(tid);
    }

    /// Whether `tid` is registered on this event.
    pub fn contains(&self, tid: ThreadId) -> bool {
        self.listeners.contains(&tid)
    }

    /// Drops `tid` from the list without waking it. Returns whether it was
    /// listed. Used when a waiter stops waiting on its own (a spurious
    /// resume, or a lock grabbed before the wake arrived).
    pub fn remove(&mut self, tid: ThreadId) -> bool {
        if let Some(pos) = self.listeners.iter().position(|t| *t == tid) {
            self.listeners.remove(pos);
            true
        } else {
            false
        }
    }

    /// Wakes the longest-waiting listener, removing it from the list.
    ///
    /// Returns the woken thread, or `None` if nobody was listening. A
    /// signal with no listener is simply dropped, so callers that must not
    /// lose it fall back to a counter, the way the semaphore does.
    pub fn trigger(&mut self) -> Option<ThreadId> {
        let tid = self.listeners.pop_front()?;
        S::wake(tid);
        Some(tid)
    }

    /// Wakes and removes every listener. Returns how many were woken.
    pub fn trigger_all(&mut self) -> usize {
        let woken = self.listeners.len();
        while let Some(tid) = self.listeners.pop_front() {
            S::wake(tid);
        }
        if woken > 0 {
            trace!("event: broadcast woke {} listener(s)", woken);
        }
        woken
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Parks the current thread until some other context wakes it.
    ///
    /// The caller has already registered through [`listen`] and dropped
    /// the embedding spinlock. Blocking is only legal from a plain thread
    /// context: holding a spinlock, masking interrupts, running inside an
    /// interrupt handler, or being the idle thread are all fatal-class
    /// misuse, not recoverable conditions.
    ///
    /// [`listen`]: Event::listen
    pub fn suspend() {
        let current = match cpu::current_thread() {
            Some(tid) => tid,
            None => crate::misuse("event: blocking with no current thread"),
        };
        if cpu::idle_thread() == Some(current) {
            crate::misuse("event: the idle thread may not block");
        }
        if cpu::spin_depth() != 0 {
            crate::misuse("event: blocking while holding a spinlock");
        }
        if !cpu::interrupts_enabled() {
            crate::misuse("event: blocking with interrupts disabled");
        }
        if cpu::in_irq() {
            crate::misuse("event: blocking in interrupt context");
        }
        S::block_current();
    }
}

impl<S: Sched> Default for Event<S> {
    fn default() -> Self {
        Self::new()
    }
}
