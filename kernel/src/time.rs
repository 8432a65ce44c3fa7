//! Tickless delay engine (component D). Tracks any number of concurrently
//! blocked sleepers, up to `MAX_TASKS`, each keyed by its wake target in a
//! small fixed-size table scanned for the earliest deadline — the
//! min-heap-of-`(target, waiter)` alternative spec.md §4.D/§9 explicitly
//! permits in place of the bare single-sleeper form. Only one hardware
//! compare event can be armed at a time, so the table is re-armed to the
//! earliest remaining target on every insertion and every wake.

use core::cell::RefCell;
use critical_section::Mutex;

use crate::config::{F, MAX_TASKS, MAX_TICKS, MIN_DELAY_TICKS};
use crate::fault::{kernel_fault, FaultReason};
use crate::hal::{Hal, SystemHal};
use crate::scheduler;
use crate::task::TaskHandle;

#[derive(Clone, Copy)]
struct Sleeper {
    target: u32,
    waiter: TaskHandle,
}

struct DelayControl {
    sleepers: [Option<Sleeper>; MAX_TASKS],
    /// Target the hardware compare event is currently armed for, if any.
    armed_target: Option<u32>,
}

impl DelayControl {
    const fn new() -> Self {
        DelayControl {
            sleepers: [None; MAX_TASKS],
            armed_target: None,
        }
    }

    /// Records `waiter` as asleep until `target`. Traps if the table is
    /// somehow already full (see `FaultReason::SleeperTableExhausted`).
    fn insert(&mut self, target: u32, waiter: TaskHandle) {
        for slot in self.sleepers.iter_mut() {
            if slot.is_none() {
                *slot = Some(Sleeper { target, waiter });
                return;
            }
        }
        kernel_fault(FaultReason::SleeperTableExhausted);
    }

    /// Index and target of the entry closest to firing relative to `now`
    /// (smallest `target.wrapping_sub(now)`), or `None` if nothing is
    /// asleep.
    fn earliest(&self, now: u32) -> Option<(usize, u32)> {
        let mut best: Option<(usize, u32, u32)> = None;
        for (i, slot) in self.sleepers.iter().enumerate() {
            if let Some(s) = slot {
                let delta = s.target.wrapping_sub(now);
                match best {
                    Some((_, _, best_delta)) if best_delta <= delta => {}
                    _ => best = Some((i, s.target, delta)),
                }
            }
        }
        best.map(|(i, target, _)| (i, target))
    }

    /// Re-programs the hardware compare event for the earliest remaining
    /// sleeper, or disarms it if the table is empty.
    fn rearm(&mut self) {
        let now = SystemHal::cpu_cycles_now();
        match self.earliest(now) {
            Some((_, target)) => {
                self.armed_target = Some(target);
                SystemHal::arm_compare(target);
            }
            None => {
                self.armed_target = None;
                SystemHal::disarm_compare();
            }
        }
    }

    /// Removes every sleeper whose target equals the value the hardware
    /// just fired on, returning their handles.
    fn take_fired(&mut self) -> TakenIter {
        let fired = self.armed_target;
        let mut out = [None; MAX_TASKS];
        let mut count = 0;
        if let Some(fired) = fired {
            for slot in self.sleepers.iter_mut() {
                if matches!(slot, Some(s) if s.target == fired) {
                    out[count] = slot.take().map(|s| s.waiter);
                    count += 1;
                }
            }
        }
        TakenIter { out, pos: 0 }
    }
}

struct TakenIter {
    out: [Option<TaskHandle>; MAX_TASKS],
    pos: usize,
}

impl Iterator for TakenIter {
    type Item = TaskHandle;
    fn next(&mut self) -> Option<TaskHandle> {
        while self.pos < self.out.len() {
            let item = self.out[self.pos].take();
            self.pos += 1;
            if item.is_some() {
                return item;
            }
        }
        None
    }
}

static DELAY: Mutex<RefCell<DelayControl>> = Mutex::new(RefCell::new(DelayControl::new()));

/// Starts the compare timer backing `cpu_cycles_now`/`arm_compare`. Call
/// once during board bring-up, before the first `delay_*` call.
pub fn time_init() {
    #[cfg(target_arch = "arm")]
    SystemHal::init_compare_timer();
}

fn ms_to_ticks(ms: u32) -> u64 {
    (ms as u64) * (F as u64) / 1_000
}

fn us_to_ticks(us: u32) -> u64 {
    (us as u64) * (F as u64) / 1_000_000
}

fn ns_to_ticks(ns: u32) -> u64 {
    (ns as u64) * (F as u64) / 1_000_000_000
}

fn clamp_ticks(ticks: u64) -> u32 {
    if ticks == 0 {
        MIN_DELAY_TICKS
    } else if ticks > MAX_TICKS as u64 {
        MAX_TICKS
    } else {
        ticks as u32
    }
}

/// Sleeps for roughly `ms` milliseconds. `delay_ms(0)` is a no-op that
/// yields once and returns immediately — it never sleeps.
pub fn delay_ms(ms: u32) {
    if ms == 0 {
        scheduler::yield_now();
        return;
    }
    delay_ticks(clamp_ticks(ms_to_ticks(ms)));
}

/// Sleeps for roughly `us` microseconds. `delay_us(0)` behaves like
/// `delay_ms(0)`.
pub fn delay_us(us: u32) {
    if us == 0 {
        scheduler::yield_now();
        return;
    }
    delay_ticks(clamp_ticks(us_to_ticks(us)));
}

/// Sleeps for roughly `ns` nanoseconds, clamped up to at least one
/// timer tick. Unlike `delay_ms`/`delay_us`, `delay_ns(0)` is upgraded to
/// the one-tick floor rather than returning immediately — see spec.md §9.
pub fn delay_ns(ns: u32) {
    delay_ticks(clamp_ticks(ns_to_ticks(ns)));
}

fn delay_ticks(ticks: u32) {
    let ticks = ticks.clamp(MIN_DELAY_TICKS, MAX_TICKS);
    critical_section::with(|cs| {
        let mut d = DELAY.borrow_ref_mut(cs);
        let now = SystemHal::cpu_cycles_now();
        let target = now.wrapping_add(ticks);
        let me = scheduler::current_handle(cs);
        d.insert(target, me);
        scheduler::block_locked(cs, me);
        d.rearm();
    });
    scheduler::yield_now();
}

/// Compare-timer ISR. Wired to the TIM2 global interrupt by the board
/// bring-up layer (out of scope — spec.md §6).
#[unsafe(no_mangle)]
pub extern "C" fn TIM2_Handler() {
    SystemHal::ack_compare();
    let mut woken_any = false;
    critical_section::with(|cs| {
        let mut d = DELAY.borrow_ref_mut(cs);
        for waiter in d.take_fired() {
            scheduler::resume_locked(cs, waiter);
            woken_any = true;
        }
        d.rearm();
    });
    if woken_any {
        scheduler::schedule();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock;
    use crate::scheduler::test_support::*;

    extern "C" fn noop(_arg: *mut core::ffi::c_void) {}

    fn reset() {
        mock::reset();
        scheduler::init();
    }

    #[test]
    fn ms_conversion_matches_f_over_one_thousand() {
        assert_eq!(ms_to_ticks(50), 50 * (F as u64) / 1_000);
    }

    #[test]
    fn delay_ns_zero_is_upgraded_to_the_floor_not_returned_immediately() {
        reset();
        let h = create_and_run();
        mock::set_counter(1_000);
        delay_ns(0);
        assert_eq!(state_of(h), Some(crate::task::TaskState::Blocked));
        assert!(mock::is_compare_armed());
        assert_eq!(mock::compare_target(), 1_000 + MIN_DELAY_TICKS);
    }

    #[test]
    fn delay_ms_zero_never_arms_the_compare_and_just_yields() {
        reset();
        let _h = create_and_run();
        mock::take_switch_pending();
        delay_ms(0);
        assert!(!mock::is_compare_armed());
        assert!(mock::take_switch_pending());
    }

    #[test]
    fn delay_arms_compare_at_current_plus_ticks_module_wrap() {
        reset();
        let h = create_and_run();
        mock::set_counter(0xFFFF_FF00);
        delay_us(1000); // 1000us * 84 ticks/us = 84_000 ticks
        let expected = 0xFFFF_FF00u32.wrapping_add(84_000);
        assert_eq!(mock::compare_target(), expected);
        assert_eq!(state_of(h), Some(crate::task::TaskState::Blocked));
    }

    #[test]
    fn wake_isr_resumes_the_waiter_and_requests_a_switch() {
        reset();
        let h = create_and_run();
        delay_us(1000);
        mock::take_switch_pending();

        TIM2_Handler();

        assert_eq!(state_of(h), Some(crate::task::TaskState::Ready));
        assert!(mock::take_switch_pending());
        assert!(!mock::is_compare_armed());
    }

    #[test]
    fn spurious_wake_isr_with_no_sleeper_changes_nothing() {
        reset();
        mock::take_switch_pending();
        TIM2_Handler();
        assert!(!mock::take_switch_pending());
    }

    #[test]
    fn resume_before_timer_fires_then_spurious_fire_is_benign() {
        reset();
        let h = create_and_run();
        delay_us(1000);
        scheduler::resume(h);
        assert_eq!(state_of(h), Some(crate::task::TaskState::Ready));

        // The timer eventually fires too; it must not double-wake or panic.
        TIM2_Handler();
        assert_eq!(state_of(h), Some(crate::task::TaskState::Ready));
    }

    #[test]
    fn two_concurrent_sleepers_each_wake_at_their_own_target() {
        reset();
        mock::set_counter(0);
        let a = scheduler::create(noop, core::ptr::null_mut(), 5).unwrap();
        let b = scheduler::create(noop, core::ptr::null_mut(), 6).unwrap();

        force_current(a);
        delay_us(100); // wakes at 8_400 ticks
        force_current(b);
        delay_us(50); // wakes at 4_200 ticks, earlier than a's

        assert_eq!(state_of(a), Some(crate::task::TaskState::Blocked));
        assert_eq!(state_of(b), Some(crate::task::TaskState::Blocked));
        assert_eq!(mock::compare_target(), 50 * 84); // re-armed to the earlier of the two

        mock::set_counter(50 * 84);
        TIM2_Handler();
        assert_eq!(state_of(b), Some(crate::task::TaskState::Ready), "earlier sleeper wakes first");
        assert_eq!(state_of(a), Some(crate::task::TaskState::Blocked), "later sleeper keeps sleeping");
        assert_eq!(mock::compare_target(), 100 * 84, "re-armed to the remaining sleeper's target");

        mock::set_counter(100 * 84);
        TIM2_Handler();
        assert_eq!(state_of(a), Some(crate::task::TaskState::Ready));
        assert!(!mock::is_compare_armed(), "nothing left to wait for");
    }

    #[test]
    fn three_sleepers_with_distinct_periods_all_eventually_wake() {
        reset();
        mock::set_counter(0);
        let fast = scheduler::create(noop, core::ptr::null_mut(), 10).unwrap();
        let medium = scheduler::create(noop, core::ptr::null_mut(), 20).unwrap();
        let slow = scheduler::create(noop, core::ptr::null_mut(), 30).unwrap();

        force_current(fast);
        delay_ms(100);
        force_current(medium);
        delay_ms(500);
        force_current(slow);
        delay_ms(1000);

        for h in [fast, medium, slow] {
            assert_eq!(state_of(h), Some(crate::task::TaskState::Blocked));
        }

        mock::set_counter(ms_to_ticks(100) as u32);
        TIM2_Handler();
        assert_eq!(state_of(fast), Some(crate::task::TaskState::Ready));
        assert_eq!(state_of(medium), Some(crate::task::TaskState::Blocked));
        assert_eq!(state_of(slow), Some(crate::task::TaskState::Blocked));

        mock::set_counter(ms_to_ticks(500) as u32);
        TIM2_Handler();
        assert_eq!(state_of(medium), Some(crate::task::TaskState::Ready));
        assert_eq!(state_of(slow), Some(crate::task::TaskState::Blocked));

        mock::set_counter(ms_to_ticks(1000) as u32);
        TIM2_Handler();
        assert_eq!(state_of(slow), Some(crate::task::TaskState::Ready));
        assert!(!mock::is_compare_armed());
    }

    fn create_and_run() -> crate::task::TaskHandle {
        let h = scheduler::create(noop, core::ptr::null_mut(), 5).unwrap();
        force_current(h);
        h
    }
}
