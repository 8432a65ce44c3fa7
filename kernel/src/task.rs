//! Task Control Block and slot registry (component B).
//!
//! Task storage is a fixed-length array owned by [`crate::scheduler`];
//! this module only defines the record and the pure (non-singleton)
//! operations on it — allocating a slot, writing an initial stack frame,
//! and picking the highest-priority ready task. Nothing here touches the
//! global scheduler state directly.

use crate::config::{IDLE_PRIORITY, MAX_TASKS, STACK_WORDS};

/// Task entry point. Takes one opaque argument; an entry function that
/// returns is undefined behavior by contract (the manufactured initial
/// frame traps it — see [`tcb_init_frame`]).
pub type TaskEntry = extern "C" fn(arg: *mut core::ffi::c_void);

/// Default xPSR value for a manufactured initial frame: Thumb bit set,
/// no other flags.
pub const DUMMY_XPSR: u32 = 0x0100_0000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TaskState {
    Ready,
    Running,
    Blocked,
}

/// A task's private stack: 256 words (1 KiB), 8-byte aligned, growing
/// downward. Owned exclusively by its task.
#[derive(Clone, Copy)]
#[repr(align(8))]
pub struct TaskStack(pub [u32; STACK_WORDS]);

impl TaskStack {
    pub const fn new() -> Self {
        TaskStack([0; STACK_WORDS])
    }

    /// One-past-the-end address: where a full stack (nothing pushed)
    /// would set its stack pointer.
    fn top(&mut self) -> *mut u32 {
        let base = self.0.as_mut_ptr();
        unsafe { base.add(STACK_WORDS) }
    }

    /// Whether `sp` lies strictly inside this stack's byte range —
    /// the invariant spec.md §3/§8 requires for every non-running task.
    pub fn contains(&self, sp: usize) -> bool {
        let base = self.0.as_ptr() as usize;
        let end = base + STACK_WORDS * core::mem::size_of::<u32>();
        sp > base && sp < end
    }
}

impl Default for TaskStack {
    fn default() -> Self {
        Self::new()
    }
}

/// A slot's handle-stability guard: a handle remembers the generation the
/// slot had when it was issued, so a stale handle (from a task that was
/// since `delete`d and the slot reused) is rejected rather than silently
/// aliasing the new occupant. The slot index itself never moves.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TaskHandle {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// Task Control Block.
#[derive(Clone, Copy)]
pub struct Tcb {
    pub stack: TaskStack,
    /// Stack pointer captured at last suspension; points at a fully
    /// formed saved-register frame on `stack`. `None` for an unoccupied
    /// slot.
    pub saved_sp: Option<usize>,
    pub priority: u8,
    pub state: TaskState,
    /// Compare-counter value at which a time-blocked task should wake;
    /// only meaningful while `state == Blocked` for a time reason.
    pub wake_target: Option<u32>,
    pub entry: Option<TaskEntry>,
    pub arg: usize,
    pub generation: u32,
    pub occupied: bool,
}

impl Tcb {
    pub const fn empty() -> Self {
        Tcb {
            stack: TaskStack::new(),
            saved_sp: None,
            priority: IDLE_PRIORITY,
            state: TaskState::Blocked,
            wake_target: None,
            entry: None,
            arg: 0,
            generation: 0,
            occupied: false,
        }
    }

    pub fn handle(&self, index: usize) -> TaskHandle {
        TaskHandle {
            index,
            generation: self.generation,
        }
    }

    /// Writes the initial saved-register frame for a never-yet-run task
    /// and sets `saved_sp` to it: 8 callee-saved words (R4–R11, zeroed —
    /// the switch-in code will load them but their contents don't matter
    /// until the task itself writes them) followed by the 8 words the
    /// hardware pushes on exception entry (R0=`arg`, R1–R3/R12=0,
    /// LR=trap-on-return, PC=`entry`, xPSR=Thumb-only).
    pub fn init_frame(&mut self, entry: TaskEntry, arg: usize, trap_on_return: extern "C" fn() -> !) {
        unsafe {
            let mut p = self.stack.top();

            p = p.offset(-1);
            p.write_volatile(DUMMY_XPSR);
            p = p.offset(-1);
            p.write_volatile(entry as usize as u32);
            p = p.offset(-1);
            p.write_volatile(trap_on_return as usize as u32);
            // R12, R3, R2, R1
            for _ in 0..4 {
                p = p.offset(-1);
                p.write_volatile(0);
            }
            // R0 carries the task argument
            p = p.offset(-1);
            p.write_volatile(arg as u32);
            // R4-R11, callee-saved, irrelevant until first save
            for _ in 0..8 {
                p = p.offset(-1);
                p.write_volatile(0);
            }

            self.entry = Some(entry);
            self.arg = arg;
            self.saved_sp = Some(p as usize);
        }
    }
}

/// Scans the table for the `Ready` task with the smallest priority
/// number. Among ties, the first slot in table order wins — deterministic,
/// not round-robin (spec.md §9's bare-form tie-break; see `DESIGN.md`).
pub fn find_highest_priority_ready(tasks: &[Tcb; MAX_TASKS]) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for (i, t) in tasks.iter().enumerate() {
        if t.occupied && t.state == TaskState::Ready {
            match best {
                Some((_, p)) if p <= t.priority => {}
                _ => best = Some((i, t.priority)),
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Returns the first unoccupied slot, if any.
pub fn free_slot(tasks: &[Tcb; MAX_TASKS]) -> Option<usize> {
    tasks.iter().position(|t| !t.occupied)
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn dummy_entry(_arg: *mut core::ffi::c_void) {}
    extern "C" fn dummy_trap() -> ! {
        loop {}
    }

    #[test]
    fn init_frame_lands_saved_sp_inside_the_stack() {
        let mut tcb = Tcb::empty();
        tcb.init_frame(dummy_entry, 0, dummy_trap);
        assert!(tcb.stack.contains(tcb.saved_sp.unwrap()));
    }

    #[test]
    fn init_frame_places_arg_in_r0_slot_and_entry_in_pc_slot() {
        let mut tcb = Tcb::empty();
        let arg = 0xDEAD_BEEFu32;
        tcb.init_frame(dummy_entry, arg as usize, dummy_trap);
        let sp = tcb.saved_sp.unwrap() as *const u32;
        unsafe {
            // Layout: [R4..R11][R0,R1,R2,R3,R12,LR,PC,xPSR]
            let r0 = sp.add(8).read();
            let lr = sp.add(13).read();
            let pc = sp.add(14).read();
            let xpsr = sp.add(15).read();
            assert_eq!(r0, arg);
            assert_eq!(lr, dummy_trap as usize as u32);
            assert_eq!(pc, dummy_entry as usize as u32);
            assert_eq!(xpsr, DUMMY_XPSR);
        }
    }

    fn table_with(states: &[(bool, TaskState, u8)]) -> [Tcb; MAX_TASKS] {
        let mut tasks = core::array::from_fn(|_| Tcb::empty());
        for (i, &(occupied, state, priority)) in states.iter().enumerate() {
            tasks[i].occupied = occupied;
            tasks[i].state = state;
            tasks[i].priority = priority;
        }
        tasks
    }

    #[test]
    fn highest_priority_ready_picks_smallest_number() {
        let tasks = table_with(&[
            (true, TaskState::Ready, 5),
            (true, TaskState::Ready, 1),
            (true, TaskState::Blocked, 0),
        ]);
        assert_eq!(find_highest_priority_ready(&tasks), Some(1));
    }

    #[test]
    fn highest_priority_ready_breaks_ties_by_first_slot() {
        let tasks = table_with(&[
            (true, TaskState::Ready, 3),
            (true, TaskState::Ready, 3),
        ]);
        assert_eq!(find_highest_priority_ready(&tasks), Some(0));
    }

    #[test]
    fn highest_priority_ready_ignores_unoccupied_and_non_ready_slots() {
        let tasks = table_with(&[
            (false, TaskState::Ready, 0),
            (true, TaskState::Running, 1),
            (true, TaskState::Blocked, 2),
        ]);
        assert_eq!(find_highest_priority_ready(&tasks), None);
    }

    #[test]
    fn free_slot_finds_first_unoccupied() {
        let tasks = table_with(&[
            (true, TaskState::Ready, 0),
            (false, TaskState::Ready, 0),
        ]);
        assert_eq!(free_slot(&tasks), Some(1));
    }
}
