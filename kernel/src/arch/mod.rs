//! Bindings to the hand-written assembly half of the context-switch and
//! bootstrap protocol (`context_switch.s`, compiled by `build.rs`). Only
//! present on the real target — host test builds never call into it.

#[cfg(target_arch = "arm")]
unsafe extern "C" {
    /// Executes `svc 0` to enter the `SVCall` handler, which restores the
    /// frame `scheduler::start()` selected and branches into it. Never
    /// returns — the exception return lands in the first task, not back
    /// here.
    pub fn start_first_task() -> !;

    fn SVCall_Handler();
    fn PendSV_Handler();
}

#[cfg(target_arch = "arm")]
mod vectors {
    use cortex_m_rt::exception;

    // Both handlers perform their own exception return from within the
    // assembly routine (a literal `bx lr` with a fixed EXC_RETURN), so
    // control never comes back to the statement after the call.
    #[exception]
    fn SVCall() {
        unsafe { super::SVCall_Handler() }
    }

    #[exception]
    fn PendSV() {
        unsafe { super::PendSV_Handler() }
    }
}
