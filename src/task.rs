//! # Task Control Block
//!
//! One record per task slot: where the task's stack lives, where its saved
//! context is, and how deep its stack has been seen to grow.
//!
//! ## Lifecycle
//!
//! ```text
//!   ┌──────────┐ create_task ┌──────────┐  first dispatch  ┌─────────┐
//!   │ Inactive │ ──────────► │ NeverRun │ ───────────────► │ Running │
//!   └──────────┘             └──────────┘                  └─────────┘
//!                                                            ▲     │
//!                                              dispatch      │     │ tick / yield
//!                                                            │     ▼
//!                                                          ┌───────────┐
//!                                                          │ Preempted │
//!                                                          └───────────┘
//! ```
//!
//! `NeverRun` and `Preempted` both hold a saved frame of the same shape at
//! `stack_pointer`; the restore path does not distinguish them.

use core::fmt;

use crate::arena::StackRegion;

/// Entry function of a task. Tasks run forever and take no arguments.
pub type TaskEntry = extern "C" fn() -> !;

/// Execution state of a task slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// Slot has no task.
    Inactive,
    /// Registered; `stack_pointer` points at the primed frame.
    NeverRun,
    /// Currently on the CPU; `stack_pointer` is stale.
    Running,
    /// Switched out; `stack_pointer` points at a captured frame.
    Preempted,
}

/// Reasons `create_task` refuses a registration. None of them mutate the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskError {
    /// Slot index is `>= MAX_TASKS`.
    SlotOutOfRange,
    /// `MAX_TASKS` tasks are already registered.
    TableFull,
    /// The slot already holds a task.
    SlotOccupied,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotOutOfRange => write!(f, "task index out of bounds"),
            Self::TableFull => write!(f, "maximum tasks reached"),
            Self::SlotOccupied => write!(f, "task slot already in use"),
        }
    }
}

pub struct TaskControlBlock {
    /// Saved top of stack. Valid whenever the task is not `Running`.
    pub stack_pointer: *mut u32,

    /// Function the primed frame resumes into.
    pub entry: Option<TaskEntry>,

    /// The task's exclusive stack memory.
    pub region: StackRegion,

    /// Deepest stack usage in bytes seen by the last monitor scan.
    /// Starts at the full region size until the first scan.
    pub high_water_mark: usize,

    /// Set when a saved stack pointer was found outside `region`.
    pub overflowed: bool,

    pub state: TaskState,
}

impl TaskControlBlock {
    pub const EMPTY: Self = Self {
        stack_pointer: core::ptr::null_mut(),
        entry: None,
        region: StackRegion::EMPTY,
        high_water_mark: 0,
        overflowed: false,
        state: TaskState::Inactive,
    };

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != TaskState::Inactive
    }
}
