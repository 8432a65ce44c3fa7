//! Hardware primitives (component A). This is the only part of the kernel
//! that knows about real MMIO addresses or exception mechanics; everything
//! in [`crate::task`], [`crate::scheduler`] and [`crate::time`] talks to
//! hardware only through the [`Hal`] trait so it can be exercised on the
//! host against [`mock`].

/// Contract the scheduler and delay engine need from the CPU and the
/// compare timer. Never exposed to application code.
pub trait Hal {
    /// Monotonic sample of the free-running 32-bit counter, in timer
    /// ticks. Wraps at 2^32; all arithmetic on it is modular.
    fn cpu_cycles_now() -> u32;

    /// Program the compare event to fire when the counter reaches
    /// `target`. Replaces any previous programming.
    fn arm_compare(target: u32);

    /// Clear the compare interrupt's pending flag without touching its
    /// enable state. Called first thing in the wake ISR (§4.D step 1).
    fn ack_compare();

    /// Cancel any pending compare event.
    fn disarm_compare();

    /// Raise the pending-switch exception (tail-chained, lowest priority).
    fn request_switch();

    /// True when called from exception context.
    fn in_isr() -> bool;
}

#[cfg(target_arch = "arm")]
pub use target::CortexM4Hal as SystemHal;

#[cfg(not(target_arch = "arm"))]
pub use mock::MockHal as SystemHal;

#[cfg(target_arch = "arm")]
mod target {
    use super::Hal;
    use drivers::read_write::{read_register, reg_write_bit, write_register};
    use drivers::stm32f407_registers::TIM2_BASE;

    const TIM_CR1: u32 = TIM2_BASE;
    const TIM_DIER: u32 = TIM2_BASE + 0x0C;
    const TIM_SR: u32 = TIM2_BASE + 0x10;
    const TIM_CNT: u32 = TIM2_BASE + 0x24;
    const TIM_ARR: u32 = TIM2_BASE + 0x2C;
    const TIM_CCR1: u32 = TIM2_BASE + 0x34;

    const CC1IE_BIT: u32 = 1;
    const CC1IF_BIT: u32 = 1;
    const CEN_BIT: u32 = 0;

    /// Real target implementation: TIM2 as the free-running 32-bit
    /// compare counter, `PendSV` as the pending-switch exception.
    pub struct CortexM4Hal;

    impl CortexM4Hal {
        /// Starts TIM2 as a free-running up-counter with the widest
        /// possible auto-reload, so it behaves as an unbounded 32-bit
        /// counter for as long as the application cares about. Must be
        /// called once during board bring-up before any `delay_*` call.
        pub fn init_compare_timer() {
            unsafe {
                write_register(TIM_ARR as *mut u32, 0xFFFF_FFFF);
                write_register(TIM_CNT as *mut u32, 0);
                reg_write_bit(TIM_CR1 as *mut u32, CEN_BIT, true);
            }
        }
    }

    impl Hal for CortexM4Hal {
        fn cpu_cycles_now() -> u32 {
            unsafe { read_register(TIM_CNT as *mut u32) }
        }

        fn arm_compare(target: u32) {
            unsafe {
                write_register(TIM_CCR1 as *mut u32, target);
                reg_write_bit(TIM_SR as *mut u32, CC1IF_BIT, false);
                reg_write_bit(TIM_DIER as *mut u32, CC1IE_BIT, true);
            }
        }

        fn ack_compare() {
            unsafe {
                reg_write_bit(TIM_SR as *mut u32, CC1IF_BIT, false);
            }
        }

        fn disarm_compare() {
            unsafe {
                reg_write_bit(TIM_DIER as *mut u32, CC1IE_BIT, false);
            }
        }

        fn request_switch() {
            cortex_m::peripheral::SCB::set_pendsv();
        }

        fn in_isr() -> bool {
            !matches!(
                cortex_m::peripheral::SCB::vect_active(),
                cortex_m::peripheral::scb::VectActive::ThreadMode
            )
        }
    }
}

/// Host-side mock used by `#[cfg(test)]` code in `task`, `scheduler` and
/// `time`: simulates the counter, the compare arming state and the
/// pending-switch flag with plain atomics, so the scheduling and timing
/// logic can be unit-tested without real hardware or an exception return.
#[cfg(any(test, not(target_arch = "arm")))]
pub mod mock {
    use super::Hal;
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);
    static COMPARE_TARGET: AtomicU32 = AtomicU32::new(0);
    static COMPARE_ARMED: AtomicBool = AtomicBool::new(false);
    static SWITCH_PENDING: AtomicBool = AtomicBool::new(false);
    static IN_ISR: AtomicBool = AtomicBool::new(false);

    pub struct MockHal;

    impl Hal for MockHal {
        fn cpu_cycles_now() -> u32 {
            COUNTER.load(Ordering::SeqCst)
        }

        fn arm_compare(target: u32) {
            COMPARE_TARGET.store(target, Ordering::SeqCst);
            COMPARE_ARMED.store(true, Ordering::SeqCst);
        }

        fn ack_compare() {
            // Mock has no separate pending-flag register; nothing to ack.
        }

        fn disarm_compare() {
            COMPARE_ARMED.store(false, Ordering::SeqCst);
        }

        fn request_switch() {
            SWITCH_PENDING.store(true, Ordering::SeqCst);
        }

        fn in_isr() -> bool {
            IN_ISR.load(Ordering::SeqCst)
        }
    }

    /// Resets every piece of simulated hardware state. Call at the start
    /// of each test that uses the mock.
    pub fn reset() {
        COUNTER.store(0, Ordering::SeqCst);
        COMPARE_TARGET.store(0, Ordering::SeqCst);
        COMPARE_ARMED.store(false, Ordering::SeqCst);
        SWITCH_PENDING.store(false, Ordering::SeqCst);
        IN_ISR.store(false, Ordering::SeqCst);
    }

    /// Forces the simulated counter to an arbitrary value, e.g. to test
    /// wrap-around near `0xFFFF_FF00`.
    pub fn set_counter(value: u32) {
        COUNTER.store(value, Ordering::SeqCst);
    }

    /// Advances the simulated counter by `ticks` (wrapping).
    pub fn advance(ticks: u32) {
        COUNTER.fetch_add(ticks, Ordering::SeqCst);
    }

    pub fn is_compare_armed() -> bool {
        COMPARE_ARMED.load(Ordering::SeqCst)
    }

    pub fn compare_target() -> u32 {
        COMPARE_TARGET.load(Ordering::SeqCst)
    }

    /// Returns whether a switch was requested since the last call, and
    /// clears the flag (mirrors the pend bit being consumed by the real
    /// `PendSV` handler).
    pub fn take_switch_pending() -> bool {
        SWITCH_PENDING.swap(false, Ordering::SeqCst)
    }

    /// Runs `f` as though it were called from exception context.
    pub fn in_isr_scope<R>(f: impl FnOnce() -> R) -> R {
        IN_ISR.store(true, Ordering::SeqCst);
        let r = f();
        IN_ISR.store(false, Ordering::SeqCst);
        r
    }
}
