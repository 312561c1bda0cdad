//! # Collaborators
//!
//! The kernel's two outward-facing dependencies. Neither is implemented by
//! the kernel itself: the firmware supplies a text sink and the platform
//! supplies a millisecond clock.

use core::fmt;

/// Line-oriented sink for human-readable status text.
///
/// Each call is one complete line, without a trailing newline.
pub trait Diagnostics {
    fn line(&mut self, args: fmt::Arguments<'_>);
}

/// Monotonic millisecond counter, wrapping at `u32::MAX`.
///
/// Paces the stack monitor only; the scheduler never reads it.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
    fn line(&mut self, args: fmt::Arguments<'_>) {
        (**self).line(args)
    }
}
