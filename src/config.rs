//! # Kernel Configuration
//!
//! Compile-time constants governing the task table, the stack arena and the
//! tick timer. All limits are fixed at compile time.

use crate::context::FRAME_BYTES;

/// Number of task slots in the task table. Slot indices run `0..MAX_TASKS`.
pub const MAX_TASKS: usize = 4;

/// Stack size in bytes for each slot, index-aligned with the task table.
///
/// Every entry must be a multiple of 8 (AAPCS stack alignment) and leave room
/// for at least one full context frame plus the guard band.
pub const STACK_SIZES: [usize; MAX_TASKS] = [1024, 256, 1024, 256];

/// Total size of the stack arena: the sum of `STACK_SIZES`.
pub const ARENA_BYTES: usize = {
    let mut total = 0;
    let mut i = 0;
    while i < MAX_TASKS {
        total += STACK_SIZES[i];
        i += 1;
    }
    total
};

/// Byte written over every stack region before a task is primed.
/// The stack monitor looks for the first byte that no longer matches it.
pub const STACK_SENTINEL: u8 = 0xAA;

/// Lowest bytes of each region that a healthy task never reaches.
/// A dirty guard band is reported as a suspected overflow.
pub const OVERFLOW_GUARD_BYTES: usize = 8;

/// System clock frequency in Hz (STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Scheduler tick frequency in Hz. One tick is one time slice.
pub const TICK_HZ: u32 = 1000;

/// Divisor applied to the system clock before it reaches the tick counter.
/// SysTick offers only 1 (core clock) or 8 (external reference on STM32F4).
pub const TICK_PRESCALE: u32 = 8;

/// Interval between two stack monitor reports, in milliseconds.
pub const MONITOR_INTERVAL_MS: u32 = 5000;

const _: () = {
    let mut i = 0;
    while i < MAX_TASKS {
        assert!(STACK_SIZES[i] % 8 == 0, "stack sizes must be multiples of 8");
        assert!(
            STACK_SIZES[i] > FRAME_BYTES + OVERFLOW_GUARD_BYTES,
            "stack too small for a context frame"
        );
        i += 1;
    }
};
