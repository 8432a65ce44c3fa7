//! Compile-time tunables for the scheduler and delay engine.
//!
//! Adjust these to match the target MCU's SRAM map and the timer clock
//! actually reaching TIM2 after the board's clock tree is configured.
//! Everything here is `const` — the kernel does no runtime configuration.

/// Maximum number of live task slots, *including* the implicit idle task
/// in slot 0. Up to `MAX_TASKS - 1` application tasks may be created.
pub const MAX_TASKS: usize = 8;

/// Size of each task's private stack, in 32-bit words. Fixed at 256 words
/// (1 KiB) per task, aligned to 8 bytes, growing downward.
pub const STACK_WORDS: usize = 256;

/// Highest (numerically largest) priority an application task may request.
/// Lower numbers are more urgent; `0` is the most urgent.
pub const MAX_PRIORITY: u8 = 254;

/// Priority of the implicit idle task: one less urgent than any
/// application task can request.
pub const IDLE_PRIORITY: u8 = MAX_PRIORITY + 1;

/// Timer frequency feeding the free-running compare counter (TIM2), in Hz.
/// STM32F407 APB1 timer clock after the ×2 doubling applied when the APB1
/// prescaler is not 1.
pub const F: u32 = 84_000_000;

/// Floor on `delay_ns` requests, in nanoseconds. Anything smaller is
/// clamped up to this many ticks worth of time so a `delay_ns(0)` still
/// sleeps for at least one tick (see the asymmetry with `delay_us(0)` /
/// `delay_ms(0)`, which return immediately).
pub const MIN_DELAY_TICKS: u32 = 1;

/// Saturation just below 2^32 so a compare target computed from
/// `current + ticks` can never lap itself before the hardware fires.
pub const MAX_TICKS: u32 = 0xFFFF_FF00;

/// NVIC priority assigned to the pending-switch (`PendSV`) exception:
/// lowest priority so it tail-chains after any other ISR.
pub const PENDSV_PRIORITY: u8 = 15;

/// NVIC priority assigned to the supervisor trap (`SVCall`) used only to
/// bootstrap the first task: highest priority.
pub const SVCALL_PRIORITY: u8 = 0;

/// NVIC priority assigned to the compare-timer (TIM2) interrupt: high
/// enough that it isn't starved by application peripheral ISRs, but below
/// `SVCall`.
pub const COMPARE_TIMER_PRIORITY: u8 = 3;

/// IRQ number for TIM2 on STM32F407 (position in the external interrupt
/// vector table, not an exception number).
pub const TIM2_IRQN: u32 = 28;
