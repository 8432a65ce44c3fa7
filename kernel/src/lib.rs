//! A small preemptive, tickless real-time kernel for a single Cortex-M4
//! core (STM32F407 class). Multiplexes a bounded number of application
//! tasks by strict priority, with a free-running 32-bit compare timer
//! armed only while something is actually waiting — there is no periodic
//! heartbeat interrupt.
//!
//! Board bring-up, the GPIO/UART/SPI/... peripheral catalog and the demo
//! application are out of scope here; see the sibling `drivers` and
//! `app` crates.

#![cfg_attr(not(test), no_std)]

mod arch;
pub mod config;
pub mod fault;
pub mod hal;
pub mod scheduler;
pub mod task;
pub mod time;

pub use task::{TaskEntry, TaskHandle};

/// Registers a new task. `None` if the table is full or `priority`
/// exceeds [`config::MAX_PRIORITY`].
pub fn create(
    entry: TaskEntry,
    arg: *mut core::ffi::c_void,
    priority: u8,
) -> Option<TaskHandle> {
    scheduler::create(entry, arg, priority)
}

/// Blocks `t`. Forces a switch if `t` is the running task.
pub fn suspend(t: TaskHandle) {
    scheduler::suspend(t)
}

/// Unblocks `t`, requesting a switch if warranted. A no-op if `t` is not
/// `Blocked`.
pub fn resume(t: TaskHandle) {
    scheduler::resume(t)
}

/// Removes `t`'s slot. Does not return if `t` is the running task.
pub fn delete(t: TaskHandle) {
    scheduler::delete(t)
}

/// Triggers the pending-switch exception and returns once selected again.
pub fn yield_now() {
    scheduler::yield_now()
}

/// Handle of the task presently running.
pub fn current() -> TaskHandle {
    scheduler::current()
}

/// Clears the task table and installs the implicit idle task. Call once
/// before `create`/`start`.
pub fn init() {
    scheduler::init()
}

/// Bootstraps the kernel: dispatches the highest-priority ready task.
/// Never returns.
pub fn start() -> ! {
    scheduler::start()
}

/// Starts the compare timer. Call once during board bring-up, before the
/// first `delay_*` call.
pub fn time_init() {
    time::time_init()
}

pub fn delay_ms(ms: u32) {
    time::delay_ms(ms)
}

pub fn delay_us(us: u32) {
    time::delay_us(us)
}

pub fn delay_ns(ns: u32) {
    time::delay_ns(ns)
}
