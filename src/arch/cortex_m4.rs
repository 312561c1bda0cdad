//! # Cortex-M4 Port Layer
//!
//! Context switching is done directly in the SysTick exception, which runs
//! at the lowest exception priority so it only ever interrupts Thread mode
//! code on the process stack.
//!
//! ## Context Switch Mechanism
//!
//! On exception entry the hardware stacks R0–R3, R12, LR, PC and xPSR onto
//! PSP. The handler stacks R4–R11 below them, giving the 16-word
//! [`ContextFrame`](crate::context::ContextFrame), passes the resulting PSP to
//! the scheduler, and unstacks R4–R11 from whatever PSP the scheduler returns.
//! The exception return then restores the hardware half.
//!
//! ## Voluntary Yield
//!
//! Setting `ICSR.PENDSTSET` marks SysTick pending without waiting for the
//! counter to wrap, so the switch happens as soon as interrupts are enabled.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::context::{EXC_RETURN_THREAD_PSP, SOFTWARE_FRAME_BYTES};
use crate::kernel;
use crate::timer::{Prescale, TickConfig};

/// SysTick CSR bit set by hardware when the counter wrapped since the last read.
const SYST_CSR_COUNTFLAG: u32 = 1 << 16;

/// Lowest priority the NVIC accepts; unimplemented low bits read as zero.
const LOWEST_PRIORITY: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Tick timer
// ---------------------------------------------------------------------------

/// Program SysTick for one interrupt per tick: stop, reset the counter,
/// select the clock, set the reload, enable the interrupt, run.
pub fn configure_tick(syst: &mut SYST, tick: &TickConfig) {
    syst.disable_counter();
    syst.clear_current();
    syst.set_clock_source(match tick.prescale {
        Prescale::Div1 => SystClkSource::Core,
        Prescale::Div8 => SystClkSource::External,
    });
    syst.set_reload(tick.reload);
    syst.enable_interrupt();
    syst.enable_counter();
}

/// Put SysTick below every other exception so it never nests over a handler
/// running on the main stack.
pub fn set_tick_priority(scb: &mut SCB) {
    // SAFETY: lowering a system handler priority cannot break a
    // priority-based critical section
    unsafe { scb.set_priority(SystemHandler::SysTick, LOWEST_PRIORITY) };
}

/// Mark the tick interrupt as already due.
#[inline]
pub fn pend_tick() {
    SCB::set_pendst();
}

/// True if the counter wrapped since the last call. Reading CSR clears the
/// flag, so only the tick path may call this.
fn counter_wrapped() -> bool {
    // SAFETY: single read of a memory-mapped register
    unsafe { (*SYST::PTR).csr.read() & SYST_CSR_COUNTFLAG != 0 }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Resume the first task from its primed frame. Never returns.
///
/// Unstacks R4–R11 exactly as the tick handler does, moves Thread mode onto
/// PSP, then unstacks the hardware half by hand (there is no exception to
/// return from) and branches to the saved PC with interrupts enabled.
///
/// # Safety
/// `sp` must address a primed frame, interrupts must be disabled, and this
/// must run once, in Thread mode on the main stack.
pub unsafe fn start_first_task(sp: *mut u32) -> ! {
    asm!(
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "movs r0, #2",          // CONTROL.SPSEL = 1: Thread mode uses PSP
        "msr control, r0",
        "isb",
        "pop {{r0-r3}}",
        "add sp, sp, #4",       // r12
        "pop {{lr}}",
        "pop {{r12}}",          // pc
        "add sp, sp, #4",       // xPSR, restored implicitly
        "orr r12, r12, #1",     // bx needs the Thumb bit
        "cpsie i",
        "bx r12",
        in("r0") sp,
        options(noreturn),
    );
}

const _: () = assert!(SOFTWARE_FRAME_BYTES == 8 * 4);
// `mvn` immediate in the handler below
const _: () = assert!(!EXC_RETURN_THREAD_PSP <= 0xFF);

// ---------------------------------------------------------------------------
// SysTick handler (context switch)
// ---------------------------------------------------------------------------

/// SysTick exception handler: the context switch.
///
/// ## Sequence
/// 1. Push R4–R11 below the hardware frame on PSP
/// 2. Hand the resulting PSP to the scheduler, get the next task's PSP back
/// 3. Pop R4–R11 from the new stack and install it as PSP
/// 4. Exception return to Thread mode on PSP (hardware pops the rest)
///
/// # Safety
/// Entered only by the NVIC, with the running task on PSP.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn SysTick() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {on_tick}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "mvn r0, #{not_exc_return}",
        "bx r0",
        on_tick = sym on_tick,
        not_exc_return = const !EXC_RETURN_THREAD_PSP,
    );
}

/// Rust half of the handler. Takes the outgoing task's saved PSP, returns
/// the incoming task's.
extern "C" fn on_tick(saved: *mut u32) -> *mut u32 {
    // A pended tick (yield) does not set COUNTFLAG, so uptime only counts
    // genuine periods.
    kernel::dispatch(counter_wrapped(), saved)
}
