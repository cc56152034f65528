//! Hardware seam: core identity and the interrupt-enable flag.

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "none", target_arch = "riscv64"))] {
        use riscv::register::sstatus;

        /// Reads the core id from `tp`. The boot path keeps the hart id
        /// there; kernel code must not repurpose the register.
        pub(crate) fn cpu_id() -> usize {
            let id;
            unsafe {
                core::arch::asm!("mv {0}, tp", out(reg) id);
            }
            id
        }

        pub(crate) fn intr_on() {
            unsafe { sstatus::set_sie() };
        }

        pub(crate) fn intr_off() {
            unsafe { sstatus::clear_sie() };
        }

        pub(crate) fn intr_get() -> bool {
            sstatus::read().sie()
        }
    } else {
        // LibOS mode: one core slot per live host thread, claimed on first
        // use and recycled when the thread exits. The "hardware" interrupt
        // flag is a per-slot bool.
        use core::sync::atomic::{AtomicBool, Ordering};
        use id_alloc::{IdAllocator, RecycleAllocator};
        use crate::NCPU;

        static SLOTS: spin::Mutex<RecycleAllocator> =
            spin::Mutex::new(RecycleAllocator::new(0));

        #[allow(clippy::declare_interior_mutable_const)]
        const INTR_INIT: AtomicBool = AtomicBool::new(true);
        static INTR: [AtomicBool; NCPU] = [INTR_INIT; NCPU];

        struct Slot(usize);

        impl Slot {
            fn claim() -> Self {
                let id = SLOTS.lock().alloc();
                assert!(id < NCPU, "more live host threads than core slots");
                crate::cpu::slot_online(id);
                Slot(id)
            }
        }

        impl Drop for Slot {
            fn drop(&mut self) {
                crate::cpu::slot_offline(self.0);
                INTR[self.0].store(true, Ordering::Relaxed);
                SLOTS.lock().dealloc(self.0);
            }
        }

        std::thread_local! {
            static SLOT: Slot = Slot::claim();
        }

        pub(crate) fn cpu_id() -> usize {
            SLOT.with(|slot| slot.0)
        }

        pub(crate) fn intr_on() {
            INTR[cpu_id()].store(true, Ordering::Relaxed);
        }

        pub(crate) fn intr_off() {
            INTR[cpu_id()].store(false, Ordering::Relaxed);
        }

        pub(crate) fn intr_get() -> bool {
            INTR[cpu_id()].load(Ordering::Relaxed)
        }
    }
}
