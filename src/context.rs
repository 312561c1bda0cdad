//! # Context Frame
//!
//! The one description of a resumable task context. The SysTick handler
//! saves and restores exactly this shape, and `create_task` synthesizes it
//! for tasks that have never run, so both kinds of task resume through the
//! same restore path.
//!
//! ## Layout (ascending addresses, 16 words)
//!
//! ```text
//!   saved SP ──► r4  r5  r6  r7  r8  r9  r10 r11   software-stacked (stmdb)
//!                r0  r1  r2  r3  r12 lr  pc  xPSR  hardware-stacked (exception entry)
//!                                                  ◄── SP before the exception
//! ```

use core::mem::size_of;

use crate::task::TaskEntry;

/// Full saved context of a task, in stack order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

/// Size of a complete frame in bytes.
pub const FRAME_BYTES: usize = size_of::<ContextFrame>();

/// Bytes pushed by the handler itself (`r4-r11`). The first-task launch
/// skips these to land on the hardware part of the frame.
pub const SOFTWARE_FRAME_BYTES: usize = 8 * 4;

/// Initial xPSR: only the Thumb bit. Cortex-M faults on an exception return
/// with T clear.
pub const INITIAL_XPSR: u32 = 0x0100_0000;

/// EXC_RETURN for "back to Thread mode, process stack, basic frame".
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

const _: () = assert!(FRAME_BYTES == 64);

impl ContextFrame {
    /// The frame a never-run task is resumed from: zeroed registers, the
    /// entry point as return address and `task_exit` as link register.
    pub fn primed(entry: TaskEntry) -> Self {
        Self {
            // Exception return ignores bit 0 of the stacked PC; keep it clear.
            pc: code_address(entry as usize) & !1,
            lr: code_address(task_exit as usize),
            xpsr: INITIAL_XPSR,
            ..Self::default()
        }
    }
}

/// Code address as a stacked register value.
///
/// Lossless on the 32-bit target. On a 64-bit host only the low word is
/// kept, so host-built frames are good for layout checks, never for
/// resuming.
#[inline]
fn code_address(addr: usize) -> u32 {
    addr as u32
}

#[cfg(bare_metal)]
const _: () = assert!(size_of::<usize>() == size_of::<u32>());

/// Push `frame` below `sp` and return the new stack top.
///
/// # Safety
/// `[sp - FRAME_BYTES, sp)` must be writable and `sp` word aligned.
pub unsafe fn push_frame(sp: *mut u32, frame: &ContextFrame) -> *mut u32 {
    let top = (sp as *mut u8).sub(FRAME_BYTES) as *mut ContextFrame;
    top.write_volatile(*frame);
    top as *mut u32
}

/// Read the frame at `sp` and return it with the stack top above it.
///
/// # Safety
/// `[sp, sp + FRAME_BYTES)` must hold a frame written by `push_frame` or by
/// the SysTick handler.
pub unsafe fn pop_frame(sp: *mut u32) -> (ContextFrame, *mut u32) {
    let frame = (sp as *const ContextFrame).read_volatile();
    (frame, (sp as *mut u8).add(FRAME_BYTES) as *mut u32)
}

/// Landing pad for a task entry that returns. Entries are `-> !`, so this
/// only runs if a task unwinds its stack by hand.
extern "C" fn task_exit() -> ! {
    loop {
        #[cfg(bare_metal)]
        cortex_m::asm::wfi();
        #[cfg(not(bare_metal))]
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn entry() -> ! {
        loop {}
    }

    /// Pins the frame to what the SysTick handler actually produces:
    /// `stmdb r0!, {r4-r11}` stores the lowest register at the lowest
    /// address, and exception entry stacks r0-r3, r12, lr, pc, xPSR upward
    /// from the software half.
    #[test]
    fn test_field_order_matches_stack_order() {
        use core::mem::offset_of;

        let software = [
            offset_of!(ContextFrame, r4),
            offset_of!(ContextFrame, r5),
            offset_of!(ContextFrame, r6),
            offset_of!(ContextFrame, r7),
            offset_of!(ContextFrame, r8),
            offset_of!(ContextFrame, r9),
            offset_of!(ContextFrame, r10),
            offset_of!(ContextFrame, r11),
        ];
        let hardware = [
            offset_of!(ContextFrame, r0),
            offset_of!(ContextFrame, r1),
            offset_of!(ContextFrame, r2),
            offset_of!(ContextFrame, r3),
            offset_of!(ContextFrame, r12),
            offset_of!(ContextFrame, lr),
            offset_of!(ContextFrame, pc),
            offset_of!(ContextFrame, xpsr),
        ];
        for (word, offset) in software.into_iter().enumerate() {
            assert_eq!(offset, word * 4);
        }
        for (word, offset) in hardware.into_iter().enumerate() {
            assert_eq!(offset, SOFTWARE_FRAME_BYTES + word * 4);
        }
    }

    #[test]
    fn test_primed_frame_values() {
        let frame = ContextFrame::primed(entry);
        // Low word only on a 64-bit host
        assert_eq!(frame.pc, (entry as usize as u32) & !1);
        assert_eq!(frame.lr, task_exit as usize as u32);
        assert_eq!(frame.xpsr, INITIAL_XPSR);
        assert_eq!(frame.r0, 0);
        assert_eq!(frame.r12, 0);
        assert_eq!(frame.r4, 0);
    }

    #[test]
    fn test_push_then_pop_restores_stack_top() {
        let mut words = [0u32; 32];
        let top = unsafe { words.as_mut_ptr().add(32) };
        let frame = ContextFrame {
            r7: 7,
            pc: 0x0800_0100,
            xpsr: INITIAL_XPSR,
            ..ContextFrame::default()
        };

        let sp = unsafe { push_frame(top, &frame) };
        assert_eq!(top as usize - sp as usize, FRAME_BYTES);
        assert_eq!(words[16 + 3], 7);
        assert_eq!(words[16 + 14], 0x0800_0100);

        let (popped, after) = unsafe { pop_frame(sp) };
        assert_eq!(popped, frame);
        assert_eq!(after, top);
    }
}
