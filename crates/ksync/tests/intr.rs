//! Interrupt scope guard behavior (LibOS mode, software interrupt flag).

use ksync::{cpu, IntrGuard};

#[test]
fn guard_restores_prior_state() {
    assert!(cpu::interrupts_enabled());
    {
        let _guard = IntrGuard::new(false);
        assert!(!cpu::interrupts_enabled());
    }
    assert!(cpu::interrupts_enabled());
}

#[test]
fn nested_guards_restore_pairwise() {
    assert!(cpu::interrupts_enabled());

    let outer = IntrGuard::new(false);
    assert!(!cpu::interrupts_enabled());
    {
        // An inner guard may re-enable; on drop it restores what the
        // outer guard established, not the original state.
        let _inner = IntrGuard::new(true);
        assert!(cpu::interrupts_enabled());
        {
            let _innermost = IntrGuard::new(false);
            assert!(!cpu::interrupts_enabled());
        }
        assert!(cpu::interrupts_enabled());
    }
    assert!(!cpu::interrupts_enabled());

    drop(outer);
    assert!(cpu::interrupts_enabled());
}

#[test]
fn guard_restores_across_early_returns() {
    fn masked_probe(bail_early: bool) -> u32 {
        let _guard = IntrGuard::new(false);
        if bail_early {
            return 1;
        }
        2
    }

    assert!(cpu::interrupts_enabled());
    assert_eq!(masked_probe(true), 1);
    assert!(cpu::interrupts_enabled());
    assert_eq!(masked_probe(false), 2);
    assert!(cpu::interrupts_enabled());
}

#[test]
fn redundant_state_is_preserved() {
    // Applying the state that is already in effect still restores
    // correctly.
    let outer = IntrGuard::new(false);
    {
        let _same = IntrGuard::new(false);
        assert!(!cpu::interrupts_enabled());
    }
    assert!(!cpu::interrupts_enabled());
    drop(outer);
    assert!(cpu::interrupts_enabled());
}
