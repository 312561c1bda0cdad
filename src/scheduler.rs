//! # Scheduler
//!
//! The task table and the round-robin dispatcher. Everything here is
//! portable: the SysTick handler in `arch` saves the register file, hands the
//! resulting stack pointer to [`Scheduler::switch_context`], and restores
//! whatever frame the returned pointer addresses.
//!
//! ## Dispatch Policy
//!
//! Strict rotation over the registered slots in slot order, one tick (or
//! less, after a yield) per dispatch. No priorities, no blocking.

use core::marker::PhantomData;

use crate::arena::{StackArena, StackRegion};
use crate::config::{MAX_TASKS, OVERFLOW_GUARD_BYTES, STACK_SENTINEL};
use crate::context::{self, ContextFrame};
use crate::monitor::Watermark;
use crate::task::{TaskControlBlock, TaskEntry, TaskError, TaskState};

/// The kernel's single piece of mutable state.
///
/// Built and populated during setup, then handed to `kernel::start`, after
/// which only the tick handler writes to it.
pub struct Scheduler<'a> {
    /// Fixed-size task table, indexed by slot.
    pub tasks: [TaskControlBlock; MAX_TASKS],

    /// Slot of the running task once started.
    pub current_task: usize,

    /// Number of registered tasks.
    pub task_count: usize,

    /// Stack region pre-assigned to each slot.
    regions: [StackRegion; MAX_TASKS],

    _arena: PhantomData<&'a mut StackArena>,
}

impl<'a> Scheduler<'a> {
    pub fn new(arena: &'a mut StackArena) -> Self {
        Self {
            tasks: [TaskControlBlock::EMPTY; MAX_TASKS],
            current_task: 0,
            task_count: 0,
            regions: arena.regions(),
            _arena: PhantomData,
        }
    }

    /// Register `entry` in `slot` and prime its stack.
    ///
    /// The slot's region is filled with the sentinel byte end to end, then a
    /// [`ContextFrame`] resuming at `entry` is pushed at its top. On error the
    /// table is left untouched.
    pub fn create_task(&mut self, entry: TaskEntry, slot: usize) -> Result<(), TaskError> {
        if slot >= MAX_TASKS {
            return Err(TaskError::SlotOutOfRange);
        }
        if self.task_count >= MAX_TASKS {
            return Err(TaskError::TableFull);
        }
        if self.tasks[slot].is_active() {
            return Err(TaskError::SlotOccupied);
        }

        let region = self.regions[slot];
        let top = (region.top() as usize & !0x07) as *mut u32;

        // SAFETY: the region is exclusive to this slot and no task runs yet
        let stack_pointer = unsafe {
            region.fill(STACK_SENTINEL);
            context::push_frame(top, &ContextFrame::primed(entry))
        };

        self.tasks[slot] = TaskControlBlock {
            stack_pointer,
            entry: Some(entry),
            region,
            high_water_mark: region.len(),
            overflowed: false,
            state: TaskState::NeverRun,
        };
        self.task_count += 1;
        Ok(())
    }

    /// Select the first task to run and return its primed stack pointer.
    /// Returns `None` if nothing is registered.
    pub fn first_stack_pointer(&mut self) -> Option<*mut u32> {
        let first = self.tasks.iter().position(TaskControlBlock::is_active)?;
        self.current_task = first;
        self.tasks[first].state = TaskState::Running;
        Some(self.tasks[first].stack_pointer)
    }

    /// Record the outgoing task's saved stack pointer, advance the rotation
    /// and return the stack pointer of the task to resume.
    ///
    /// Must only be called with at least one task registered and with the
    /// scheduler started.
    pub fn switch_context(&mut self, saved: *mut u32) -> *mut u32 {
        let current = self.current_task;
        let outgoing = &mut self.tasks[current];
        outgoing.stack_pointer = saved;
        outgoing.state = TaskState::Preempted;
        if !outgoing.region.contains(saved) {
            outgoing.overflowed = true;
        }

        let next = self.next_after(current);
        self.current_task = next;
        self.tasks[next].state = TaskState::Running;
        self.tasks[next].stack_pointer
    }

    /// Next active slot after `slot`, wrapping. With slots `0..n` registered
    /// this is `(slot + 1) % n`.
    fn next_after(&self, slot: usize) -> usize {
        (1..=MAX_TASKS)
            .map(|step| (slot + step) % MAX_TASKS)
            .find(|&i| self.tasks[i].is_active())
            .unwrap_or(slot)
    }

    /// Measure the deepest stack excursion of the task in `slot` and store it
    /// as its high-water mark. Returns `None` for an inactive slot.
    pub fn scan_stack(&mut self, slot: usize) -> Option<Watermark> {
        let tcb = self.tasks.get_mut(slot).filter(|tcb| tcb.is_active())?;

        // SAFETY: regions come from the arena borrowed for 'a
        let untouched = unsafe { tcb.region.first_dirty_offset(STACK_SENTINEL) };
        tcb.high_water_mark = tcb.region.len() - untouched;

        Some(Watermark {
            slot,
            used: tcb.high_water_mark,
            size: tcb.region.len(),
            overflow_suspected: tcb.overflowed || untouched < OVERFLOW_GUARD_BYTES,
        })
    }

    pub fn current_tcb(&self) -> &TaskControlBlock {
        &self.tasks[self.current_task]
    }
}
