//! Synchronization and blocking coordination for a monolithic kernel.
//!
//! The crate is layered bottom-up:
//!
//! - [`cpu`]: per-core records and scoped interrupt masking;
//! - [`SpinLock`]: busy-wait mutual exclusion, interrupts disabled while held;
//! - [`Event`]: the wait/wake engine, the only piece that talks to the
//!   scheduler (through the [`Sched`] seam);
//! - [`Semaphore`], [`Mutex`], [`Condvar`]: blocking primitives built from a
//!   spinlock-protected state plus an event.
//!
//! Lock order, outermost first: a primitive's internal spinlock, then the
//! scheduler's own structures (inside [`Sched::wake`] and
//! [`Sched::block_current`]). No code path here holds two different
//! primitives' internal locks at once, so lock-order inversion between
//! primitives cannot arise inside this crate.
//!
//! On `target_os = "none"` the hardware seam uses the real interrupt flag
//! and hart id. Everywhere else the crate runs in LibOS mode: every host
//! thread is bound to its own core slot with a software interrupt flag, and
//! [`HostSched`] drives the blocking primitives on ordinary `std` threads.
//! The full test suite runs in that mode.

#![no_std]

#[cfg(not(target_os = "none"))]
extern crate std;

extern crate alloc;

mod arch;
mod condvar;
pub mod cpu;
mod event;
mod mutex;
mod sched;
mod semaphore;
mod spinlock;

pub use condvar::Condvar;
pub use cpu::{pop_off, push_off, IntrGuard};
pub use event::Event;
pub use mutex::Mutex;
pub use sched::{Sched, ThreadId};
pub use semaphore::Semaphore;
pub use spinlock::{SpinLock, SpinLockGuard};

#[cfg(not(target_os = "none"))]
pub use sched::host::{self, HostSched};

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        /// Number of per-core slots.
        pub const NCPU: usize = 16;
    } else {
        /// Number of per-core slots. In LibOS mode every live host thread
        /// occupies its own slot, so the table is sized for a parallel test
        /// harness rather than for real hardware.
        pub const NCPU: usize = 256;
    }
}

/// Reports a fatal caller-side bug and halts via panic.
#[cold]
pub(crate) fn misuse(msg: &str) -> ! {
    log::error!("{}", msg);
    panic!("{}", msg);
}
