//! Per-core state and scoped interrupt masking.
//!
//! One [`CpuState`] record per core slot, reached through a core-indexed
//! lookup. All mutation goes through the functions here; no other code
//! writes the fields directly. A record is only ever touched by the core
//! it belongs to, which is what makes the `&mut` access sound.

use core::cell::UnsafeCell;
use core::marker::PhantomData;

use crate::{arch, sched::ThreadId, NCPU};

/// Per-core record.
///
/// The scheduler owns `current` and `idle`; this crate reads them to decide
/// lock ownership and whether blocking is legal on this core.
struct CpuState {
    id: usize,
    online: bool,
    /// Thread currently executing on this core. Exactly one per core.
    current: Option<ThreadId>,
    /// The idle thread bound to this core. It must never block on the
    /// primitives in this crate.
    idle: Option<ThreadId>,
    /// Nesting depth of interrupt handlers running on this core.
    irq_depth: usize,
    in_syscall: bool,
    last_syscall: usize,
    /// Depth of push_off() nesting.
    noff: usize,
    /// Were interrupts enabled before the first push_off()?
    intena: bool,
}

impl CpuState {
    const fn new() -> Self {
        CpuState {
            id: 0,
            online: false,
            current: None,
            idle: None,
            irq_depth: 0,
            in_syscall: false,
            last_syscall: 0,
            noff: 0,
            intena: false,
        }
    }
}

struct PerCpu([UnsafeCell<CpuState>; NCPU]);

// Each slot is only accessed from the core it describes.
unsafe impl Sync for PerCpu {}

#[allow(clippy::declare_interior_mutable_const)]
const SLOT_INIT: UnsafeCell<CpuState> = UnsafeCell::new(CpuState::new());
static CPUS: PerCpu = PerCpu([SLOT_INIT; NCPU]);

/// This core's record.
fn local() -> &'static mut CpuState {
    unsafe { &mut *CPUS.0[arch::cpu_id()].get() }
}

#[cfg(not(target_os = "none"))]
pub(crate) fn slot_online(id: usize) {
    let cpu = unsafe { &mut *CPUS.0[id].get() };
    *cpu = CpuState::new();
    cpu.id = id;
    cpu.online = true;
    log::trace!("cpu{}: host thread bound", cpu.id);
}

#[cfg(not(target_os = "none"))]
pub(crate) fn slot_offline(id: usize) {
    let cpu = unsafe { &mut *CPUS.0[id].get() };
    cpu.online = false;
    cpu.current = None;
}

/// Id of the calling core.
pub fn cpu_id() -> usize {
    arch::cpu_id()
}

pub fn is_online() -> bool {
    local().online
}

/// Marks this core online. The boot path calls this once per core; in
/// LibOS mode slots come online automatically.
pub fn set_online(online: bool) {
    let cpu = local();
    cpu.id = arch::cpu_id();
    cpu.online = online;
}

/// Thread currently executing on this core.
pub fn current_thread() -> Option<ThreadId> {
    local().current
}

/// Scheduler-facing: installs the thread now running on this core.
pub fn set_current(tid: Option<ThreadId>) {
    local().current = tid;
}

pub fn idle_thread() -> Option<ThreadId> {
    local().idle
}

/// Scheduler-facing: binds this core's idle thread.
pub fn set_idle(tid: Option<ThreadId>) {
    local().idle = tid;
}

/// Trap-entry accounting. Called by the interrupt path on every nesting
/// level.
pub fn irq_enter() {
    local().irq_depth += 1;
}

pub fn irq_exit() {
    let cpu = local();
    assert!(cpu.irq_depth >= 1);
    cpu.irq_depth -= 1;
}

/// Whether this core is currently inside an interrupt handler.
pub fn in_irq() -> bool {
    local().irq_depth > 0
}

/// Records that the current thread entered the kernel through syscall `no`.
pub fn enter_syscall(no: usize) {
    let cpu = local();
    cpu.in_syscall = true;
    cpu.last_syscall = no;
}

pub fn leave_syscall() {
    local().in_syscall = false;
}

pub fn in_syscall() -> bool {
    local().in_syscall
}

/// Id of the last syscall that entered on this core. Diagnostic only.
pub fn last_syscall() -> usize {
    local().last_syscall
}

/// Current state of the (hardware or emulated) interrupt-enable flag.
pub fn interrupts_enabled() -> bool {
    arch::intr_get()
}

/// Spinlock nesting depth on this core.
pub(crate) fn spin_depth() -> usize {
    local().noff
}

/// Saves the interrupt-enable bit on the first `push_off()` and disables
/// interrupts. The nesting depth grows by one.
pub fn push_off() {
    let old = arch::intr_get();
    arch::intr_off();
    let cpu = local();
    if cpu.noff == 0 {
        cpu.intena = old;
    }
    cpu.noff += 1;
}

/// Undoes one `push_off()`. Interrupts come back on when the depth returns
/// to zero and they were enabled before the first `push_off()`.
pub fn pop_off() {
    let cpu = local();
    assert!(!arch::intr_get() && cpu.noff >= 1);
    cpu.noff -= 1;
    if cpu.noff == 0 && cpu.intena {
        arch::intr_on();
    }
}

/// Scoped interrupt masking.
///
/// Captures the interrupt-enable state at construction, applies the
/// requested one, and restores the captured state when dropped, on every
/// exit path out of the scope, early returns included. Guards nest
/// pairwise: an inner guard restores the state the outer guard established.
///
/// Must not be used to re-enable interrupts inside a spinlock critical
/// section, and must not be held across a voluntary context switch.
pub struct IntrGuard {
    prev: bool,
    // Not Send: the captured flag belongs to the creating core.
    _core: PhantomData<*const ()>,
}

impl IntrGuard {
    pub fn new(enable: bool) -> Self {
        let prev = arch::intr_get();
        if enable {
            arch::intr_on();
        } else {
            arch::intr_off();
        }
        IntrGuard {
            prev,
            _core: PhantomData,
        }
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        if self.prev {
            arch::intr_on();
        } else {
            arch::intr_off();
        }
    }
}
