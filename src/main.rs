//! # rrtos Demo Firmware
//!
//! Four tasks sharing the CPU in 1 ms slices:
//!
//! | Slot | Task | Stack | Behavior |
//! |------|------|-------|----------|
//! | 0 | `stack_monitor_task` | 1024 | Reports stack high-water marks every 5 s |
//! | 1 | `busy_counter_task` | 256 | Counts without ever yielding |
//! | 2 | `deep_counter_task` | 1024 | Counts, periodically touching a deep stack buffer |
//! | 3 | `yielding_counter_task` | 256 | Counts, yielding after every step |
//!
//! Output goes to the RTT up channel.

#![no_std]
#![no_main]

use core::fmt;
use core::hint::black_box;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};

use rrtos::arena::StackArena;
use rrtos::diag::Diagnostics;
use rrtos::kernel::{self, TickClock};
use rrtos::scheduler::Scheduler;

/// Diagnostics sink writing one RTT line per call.
struct Rtt;

impl Diagnostics for Rtt {
    fn line(&mut self, args: fmt::Arguments<'_>) {
        rprintln!("{}", args);
    }
}

static BUSY_COUNT: AtomicU32 = AtomicU32::new(0);
static DEEP_COUNT: AtomicU32 = AtomicU32::new(0);
static YIELD_COUNT: AtomicU32 = AtomicU32::new(0);

// ---------------------------------------------------------------------------
// Task entry points
// ---------------------------------------------------------------------------

extern "C" fn stack_monitor_task() -> ! {
    kernel::run_stack_monitor(&TickClock, &mut Rtt)
}

/// Never yields; leaves the CPU only when its slice expires.
extern "C" fn busy_counter_task() -> ! {
    loop {
        BUSY_COUNT.fetch_add(1, Ordering::Relaxed);
    }
}

/// Every 100 000 steps, fills a 256-byte local buffer so the monitor has a
/// deeper mark to find than the loop's steady-state depth.
extern "C" fn deep_counter_task() -> ! {
    loop {
        let n = DEEP_COUNT.fetch_add(1, Ordering::Relaxed);
        if n % 100_000 == 0 {
            let mut scratch = [0u8; 256];
            for (i, byte) in scratch.iter_mut().enumerate() {
                *byte = i as u8;
            }
            black_box(&mut scratch);
        }
    }
}

extern "C" fn yielding_counter_task() -> ! {
    loop {
        YIELD_COUNT.fetch_add(1, Ordering::Relaxed);
        kernel::yield_now();
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let cp = cortex_m::Peripherals::take().unwrap();
    let arena = cortex_m::singleton!(: StackArena = StackArena::new()).unwrap();

    let mut scheduler = Scheduler::new(arena);
    let mut rtt = Rtt;

    kernel::create_task(&mut scheduler, stack_monitor_task, 0, &mut rtt);
    kernel::create_task(&mut scheduler, busy_counter_task, 1, &mut rtt);
    kernel::create_task(&mut scheduler, deep_counter_task, 2, &mut rtt);
    kernel::create_task(&mut scheduler, yielding_counter_task, 3, &mut rtt);

    rprintln!("rrtos: {} tasks registered", scheduler.task_count);

    // Hands the CPU to slot 0; never returns
    kernel::start(scheduler, cp, &mut rtt)
}
