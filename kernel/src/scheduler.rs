//! Scheduler (component C): the state machine, bootstrap, and the
//! context-switch protocol's Rust-side half. The assembly half lives in
//! `arch::context_switch` and calls back into [`pendsv_switch`] and
//! [`scheduler_current_psp`] by their `extern "C"` names.

use core::cell::RefCell;
use critical_section::{CriticalSection, Mutex};

use crate::config::{IDLE_PRIORITY, MAX_PRIORITY, MAX_TASKS};
use crate::fault::{self, FaultReason};
use crate::hal::{Hal, SystemHal};
use crate::task::{self, TaskEntry, TaskHandle, TaskState, Tcb};

struct SchedulerState {
    tasks: [Tcb; MAX_TASKS],
    task_count: usize,
    current: usize,
    started: bool,
}

impl SchedulerState {
    const fn new() -> Self {
        SchedulerState {
            tasks: [Tcb::empty(); MAX_TASKS],
            task_count: 0,
            current: 0,
            started: false,
        }
    }
}

static SCHEDULER: Mutex<RefCell<SchedulerState>> = Mutex::new(RefCell::new(SchedulerState::new()));

fn valid(s: &SchedulerState, t: TaskHandle) -> bool {
    t.index < MAX_TASKS && s.tasks[t.index].occupied && s.tasks[t.index].generation == t.generation
}

extern "C" fn idle_entry(_arg: *mut core::ffi::c_void) {
    loop {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();
        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}

/// Clears the table and installs the implicit idle task in slot 0 at
/// `IDLE_PRIORITY`. Call once before any `create`/`start`.
pub fn init() {
    critical_section::with(|cs| {
        let mut s = SCHEDULER.borrow_ref_mut(cs);
        *s = SchedulerState::new();
        s.tasks[0].init_frame(idle_entry, 0, fault::task_returned_trap);
        s.tasks[0].occupied = true;
        s.tasks[0].priority = IDLE_PRIORITY;
        s.tasks[0].state = TaskState::Ready;
    });
}

/// Registers a new task. Returns `None` if the slot table is full or
/// `priority` exceeds `MAX_PRIORITY` — both are caller-recoverable, per
/// spec.md §7 error kinds 1 and 2.
pub fn create(entry: TaskEntry, arg: *mut core::ffi::c_void, priority: u8) -> Option<TaskHandle> {
    if priority > MAX_PRIORITY {
        return None;
    }
    critical_section::with(|cs| {
        let mut s = SCHEDULER.borrow_ref_mut(cs);
        let idx = (1..MAX_TASKS).find(|&i| !s.tasks[i].occupied)?;
        s.tasks[idx].init_frame(entry, arg as usize, fault::task_returned_trap);
        s.tasks[idx].occupied = true;
        s.tasks[idx].priority = priority;
        s.tasks[idx].state = TaskState::Ready;
        s.task_count += 1;
        Some(s.tasks[idx].handle(idx))
    })
}

/// Bootstraps the kernel: selects the highest-priority ready task and
/// issues the supervisor trap that restores its frame. Never returns.
/// Fatal if no task was ever created (the idle task installed by `init`
/// always counts, so this only fires if `init` itself was skipped).
pub fn start() -> ! {
    critical_section::with(|cs| {
        let mut s = SCHEDULER.borrow_ref_mut(cs);
        match task::find_highest_priority_ready(&s.tasks) {
            Some(idx) => {
                s.current = idx;
                s.tasks[idx].state = TaskState::Running;
                s.started = true;
            }
            None => fault::kernel_fault(FaultReason::StartWithNoTasks),
        }
    });
    #[cfg(target_arch = "arm")]
    unsafe {
        crate::arch::start_first_task()
    }
    #[cfg(not(target_arch = "arm"))]
    unreachable!("start() only performs an exception-return bootstrap on target hardware");
}

/// Triggers the pending-switch exception. Returns to the caller once it
/// is selected again. Safe from ISR context — it only sets the pend bit.
pub fn yield_now() {
    SystemHal::request_switch();
}

/// Handle of the task presently running.
pub fn current() -> TaskHandle {
    critical_section::with(current_handle)
}

/// Blocks `t`. If `t` is the running task, this forces a switch away
/// from it (the caller stops running at this point and resumes, if ever,
/// only after something later calls `resume` on it).
pub fn suspend(t: TaskHandle) {
    let is_current = critical_section::with(|cs| {
        let mut s = SCHEDULER.borrow_ref_mut(cs);
        if !valid(&s, t) {
            return false;
        }
        s.tasks[t.index].state = TaskState::Blocked;
        t.index == s.current
    });
    if is_current {
        yield_now();
    }
}

/// Unblocks `t` if it was `Blocked`; a no-op on an already-ready task
/// (spec.md §7 error kind 4). Requests a switch if warranted.
pub fn resume(t: TaskHandle) {
    critical_section::with(|cs| resume_locked(cs, t));
    schedule();
}

pub(crate) fn resume_locked(cs: CriticalSection, t: TaskHandle) {
    let mut s = SCHEDULER.borrow_ref_mut(cs);
    if valid(&s, t) && s.tasks[t.index].state == TaskState::Blocked {
        s.tasks[t.index].state = TaskState::Ready;
    }
}

/// Removes `t`'s slot. The idle task (handle index 0, never exposed by
/// `create`) cannot be deleted. If `t` was running this forces a switch
/// away from it and never returns to the caller.
pub fn delete(t: TaskHandle) {
    let is_current = critical_section::with(|cs| {
        let mut s = SCHEDULER.borrow_ref_mut(cs);
        if t.index == 0 || !valid(&s, t) {
            return false;
        }
        let was_current = t.index == s.current;
        let next_generation = s.tasks[t.index].generation.wrapping_add(1);
        s.tasks[t.index] = Tcb::empty();
        s.tasks[t.index].generation = next_generation;
        s.task_count -= 1;
        was_current
    });
    if is_current {
        SystemHal::request_switch();
        loop {
            core::hint::spin_loop();
        }
    }
}

/// If the highest-priority ready task differs from the one running,
/// requests a switch. Safe to call from ISR or task context.
pub fn schedule() {
    let need_switch = critical_section::with(|cs| {
        let s = SCHEDULER.borrow_ref(cs);
        match task::find_highest_priority_ready(&s.tasks) {
            Some(idx) => idx != s.current,
            None => false,
        }
    });
    if need_switch {
        SystemHal::request_switch();
    }
}

// ---- internals shared with `time` (avoid nesting `critical_section::with`) ----

pub(crate) fn current_handle(cs: CriticalSection) -> TaskHandle {
    let s = SCHEDULER.borrow_ref(cs);
    s.tasks[s.current].handle(s.current)
}

pub(crate) fn block_locked(cs: CriticalSection, t: TaskHandle) {
    let mut s = SCHEDULER.borrow_ref_mut(cs);
    if valid(&s, t) {
        s.tasks[t.index].state = TaskState::Blocked;
    }
}

// ---- context-switch / bootstrap glue called from `arch::context_switch` ----

/// Called from the `SVCall` handler to fetch the PSP of the task picked
/// by `start()`, as a bootstrap-only counterpart to [`pendsv_switch`].
#[unsafe(no_mangle)]
pub extern "C" fn scheduler_current_psp() -> u32 {
    critical_section::with(|cs| {
        let s = SCHEDULER.borrow_ref(cs);
        s.tasks[s.current].saved_sp.unwrap_or(0) as u32
    })
}

/// Called from the `PendSV` handler after it has pushed R4–R11 onto the
/// outgoing task's stack. Implements steps 2–4 of the context-switch
/// protocol (spec.md §4.C) and returns the PSP the handler should load —
/// either the incoming task's (on an actual switch) or the same one
/// handed in (if nothing more urgent is ready, leaving everything
/// unchanged per step 3's "if next == current" case).
#[unsafe(no_mangle)]
pub extern "C" fn pendsv_switch(outgoing_sp: u32) -> u32 {
    critical_section::with(|cs| {
        let mut s = SCHEDULER.borrow_ref_mut(cs);
        let cur = s.current;
        s.tasks[cur].saved_sp = Some(outgoing_sp as usize);
        if s.tasks[cur].state == TaskState::Running {
            s.tasks[cur].state = TaskState::Ready;
        }
        let next = task::find_highest_priority_ready(&s.tasks).unwrap_or(cur);
        s.tasks[next].state = TaskState::Running;
        s.current = next;
        s.tasks[next].saved_sp.unwrap_or(outgoing_sp as usize) as u32
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn current_index() -> usize {
        critical_section::with(|cs| SCHEDULER.borrow_ref(cs).current)
    }

    pub fn task_count() -> usize {
        critical_section::with(|cs| SCHEDULER.borrow_ref(cs).task_count)
    }

    pub fn state_of(t: TaskHandle) -> Option<TaskState> {
        critical_section::with(|cs| {
            let s = SCHEDULER.borrow_ref(cs);
            valid(&s, t).then(|| s.tasks[t.index].state)
        })
    }

    pub fn priority_of(t: TaskHandle) -> Option<u8> {
        critical_section::with(|cs| {
            let s = SCHEDULER.borrow_ref(cs);
            valid(&s, t).then(|| s.tasks[t.index].priority)
        })
    }

    pub fn force_current(t: TaskHandle) {
        critical_section::with(|cs| {
            let mut s = SCHEDULER.borrow_ref_mut(cs);
            s.current = t.index;
            s.tasks[t.index].state = TaskState::Running;
        });
    }
}
