//! # Critical Sections
//!
//! Task code reaching into the scheduler state does so with the tick
//! interrupt masked, since the tick handler writes that state without locks.

use cortex_m::interrupt;

/// Run `f` with interrupts disabled, restoring the previous state on exit.
///
/// Keep the body short: a tick that comes due inside it is delayed until
/// the section ends.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
