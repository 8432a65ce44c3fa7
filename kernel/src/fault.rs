//! Fatal-condition handling (spec.md §7 error kinds 3 and 5).
//!
//! Everything the kernel cannot recover from — a task returning, `start`
//! with no tasks, a delay requested before the compare timer is running,
//! the sleeper table filling up — traps here instead of unwinding or
//! returning an error code. Hardware fault exceptions (`HardFault` and the
//! configurable faults) are not raised by the kernel itself but are
//! trapped the same way so a debugger can inspect the halted state.

#[derive(Clone, Copy, Debug)]
pub enum FaultReason {
    /// A task function executed `bx lr` (returned) instead of looping
    /// forever — undefined behavior per spec.md §3, trapped here because
    /// the manufactured initial frame points LR at [`task_returned_trap`].
    TaskReturned,
    /// `start()` was called with no task ever created.
    StartWithNoTasks,
    /// `delay_*` was called before the compare timer was initialized.
    DelayOnUninitializedTimer,
    /// The sleeper table (sized to `MAX_TASKS`) had no free entry for a new
    /// `delay_*` call. Can't happen in practice — a task occupies at most
    /// one entry, and the one calling `delay_*` isn't in the table yet —
    /// trapped as a defensive invariant check rather than assumed away.
    SleeperTableExhausted,
    HardFault,
    MemManageFault,
    BusFault,
    UsageFault,
}

/// Halts the system, preserving CPU state for a debugger. Never returns.
pub fn kernel_fault(reason: FaultReason) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("kernel fault: {}", defmt::Debug2Format(&reason));
    #[cfg(not(feature = "defmt"))]
    let _ = reason;

    critical_section::with(|_cs| loop {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();
    })
}

/// Installed as the LR of every manufactured initial stack frame
/// (see [`crate::task::Tcb::init_frame`]). Reached only if a task
/// function returns.
#[unsafe(no_mangle)]
pub extern "C" fn task_returned_trap() -> ! {
    kernel_fault(FaultReason::TaskReturned)
}

#[cfg(target_arch = "arm")]
mod exceptions {
    use super::{kernel_fault, FaultReason};
    use cortex_m_rt::exception;

    #[exception]
    unsafe fn HardFault(_frame: &cortex_m_rt::ExceptionFrame) -> ! {
        kernel_fault(FaultReason::HardFault)
    }

    #[exception]
    fn MemoryManagement() {
        kernel_fault(FaultReason::MemManageFault)
    }

    #[exception]
    fn BusFault() {
        kernel_fault(FaultReason::BusFault)
    }

    #[exception]
    fn UsageFault() {
        kernel_fault(FaultReason::UsageFault)
    }
}
