//! # Kernel
//!
//! Public kernel API: task registration, startup, voluntary yield, and the
//! stack monitor task body.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► Scheduler::new(arena)   ← Bind the stack arena
//!         ├─► kernel::create_task()   ← Register tasks (×N)
//!         └─► kernel::start()         ← Launch scheduler (no return)
//!               ├─► Publish the scheduler to the tick handler
//!               ├─► Configure SysTick
//!               └─► Resume the first task from its primed frame
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use crate::diag::Diagnostics;
use crate::scheduler::Scheduler;
use crate::task::TaskEntry;
use crate::timer::TICK_MS;

#[cfg(bare_metal)]
pub use self::target::*;

/// Register `entry` in `slot`.
///
/// Setup-phase only. A refused registration is reported through `diag` and
/// leaves the table as it was.
pub fn create_task<D: Diagnostics>(
    scheduler: &mut Scheduler<'_>,
    entry: TaskEntry,
    slot: usize,
    diag: &mut D,
) {
    if let Err(err) = scheduler.create_task(entry, slot) {
        diag.line(format_args!("Task {} not created: {}", slot, err));
    }
}

/// One pass of the tick path: account elapsed time, then rotate.
///
/// `counter_wrapped` is true when a full tick period elapsed. A tick pended
/// by `yield_now` arrives with it false, so the switch still happens at once
/// but `uptime_ms` stays put. Returns the stack pointer to resume.
pub fn tick(
    scheduler: &mut Scheduler<'_>,
    uptime_ms: &AtomicU32,
    counter_wrapped: bool,
    saved: *mut u32,
) -> *mut u32 {
    if counter_wrapped {
        uptime_ms.fetch_add(TICK_MS, Ordering::Relaxed);
    }
    scheduler.switch_context(saved)
}

#[cfg(bare_metal)]
mod target {
    use core::ptr;
    use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

    use super::tick;

    use crate::arch::cortex_m4;
    use crate::config::MONITOR_INTERVAL_MS;
    use crate::diag::{Clock, Diagnostics};
    use crate::monitor::StackMonitor;
    use crate::scheduler::Scheduler;
    use crate::sync;
    use crate::timer::TICK;

    /// The running scheduler. Null until `start`; written once.
    static ACTIVE: AtomicPtr<Scheduler<'static>> = AtomicPtr::new(ptr::null_mut());

    /// Milliseconds of genuine ticks since `start`.
    static UPTIME_MS: AtomicU32 = AtomicU32::new(0);

    /// Start the kernel. **Does not return.**
    ///
    /// Moves the scheduler into static storage, arms SysTick and resumes the
    /// first registered task. With no task registered it reports the fact
    /// and parks the core.
    pub fn start<D: Diagnostics>(
        scheduler: Scheduler<'static>,
        mut core_peripherals: cortex_m::Peripherals,
        diag: &mut D,
    ) -> ! {
        cortex_m::interrupt::disable();

        let scheduler = match cortex_m::singleton!(: Scheduler<'static> = scheduler) {
            Some(scheduler) => scheduler,
            None => park(diag, "kernel already started"),
        };
        let first_sp = match scheduler.first_stack_pointer() {
            Some(sp) => sp,
            None => park(diag, "no tasks registered, scheduler not started"),
        };
        ACTIVE.store(scheduler, Ordering::Release);

        cortex_m4::set_tick_priority(&mut core_peripherals.SCB);
        cortex_m4::configure_tick(&mut core_peripherals.SYST, &TICK);

        // SAFETY: interrupts are off, the frame was primed by create_task,
        // and the singleton above guarantees a single launch
        unsafe { cortex_m4::start_first_task(first_sp) }
    }

    fn park<D: Diagnostics>(diag: &mut D, reason: &str) -> ! {
        diag.line(format_args!("Kernel halted: {}", reason));
        loop {
            cortex_m::asm::wfi();
        }
    }

    /// Give up the rest of the current time slice.
    ///
    /// Returns once the rotation comes back to the calling task. Call with
    /// interrupts enabled.
    pub fn yield_now() {
        sync::critical_section(|_cs| cortex_m4::pend_tick());
    }

    /// Run `f` on the scheduler with the tick masked. `None` before `start`.
    pub fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler<'static>) -> R) -> Option<R> {
        sync::critical_section(|_cs| {
            // SAFETY: the tick handler, the only other user, cannot run
            // inside the critical section
            unsafe { ACTIVE.load(Ordering::Acquire).as_mut() }.map(f)
        })
    }

    /// Tick path: record the outgoing task and pick the next one.
    pub(crate) fn dispatch(counter_wrapped: bool, saved: *mut u32) -> *mut u32 {
        // SAFETY: the tick handler does not nest and task code only touches
        // the scheduler inside critical sections
        match unsafe { ACTIVE.load(Ordering::Acquire).as_mut() } {
            Some(scheduler) => tick(scheduler, &UPTIME_MS, counter_wrapped, saved),
            None => saved,
        }
    }

    /// Uptime clock driven by the scheduler tick.
    pub struct TickClock;

    impl Clock for TickClock {
        fn now_ms(&self) -> u32 {
            UPTIME_MS.load(Ordering::Relaxed)
        }
    }

    /// Body of the stack monitor task: report every task's high-water mark
    /// each `MONITOR_INTERVAL_MS`, yielding between checks.
    pub fn run_stack_monitor<C: Clock, D: Diagnostics>(clock: &C, diag: &mut D) -> ! {
        let mut monitor = StackMonitor::new(MONITOR_INTERVAL_MS);
        loop {
            // One critical section per slot keeps the tick latency bounded
            // by the largest region.
            monitor.poll(
                clock.now_ms(),
                |slot| with_scheduler(|s| s.scan_stack(slot)).flatten(),
                diag,
            );
            yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::StackArena;
    use crate::config::MAX_TASKS;
    use core::fmt::Write;
    use heapless::{String, Vec};

    #[derive(Default)]
    struct Capture {
        lines: Vec<String<64>, 4>,
    }

    impl Diagnostics for Capture {
        fn line(&mut self, args: core::fmt::Arguments<'_>) {
            let mut line = String::new();
            line.write_fmt(args).unwrap();
            self.lines.push(line).unwrap();
        }
    }

    extern "C" fn spin() -> ! {
        loop {}
    }

    #[test]
    fn test_create_task_reports_rejection() {
        let mut arena = StackArena::new();
        let mut sched = Scheduler::new(&mut arena);
        let mut sink = Capture::default();

        create_task(&mut sched, spin, 0, &mut sink);
        assert!(sink.lines.is_empty());

        create_task(&mut sched, spin, MAX_TASKS, &mut sink);
        create_task(&mut sched, spin, 0, &mut sink);

        assert_eq!(sched.task_count, 1);
        assert_eq!(sink.lines[0].as_str(), "Task 4 not created: task index out of bounds");
        assert_eq!(sink.lines[1].as_str(), "Task 0 not created: task slot already in use");
    }

    #[test]
    fn test_pended_tick_switches_without_advancing_uptime() {
        let mut arena = StackArena::new();
        let mut sched = Scheduler::new(&mut arena);
        let mut sink = Capture::default();
        create_task(&mut sched, spin, 0, &mut sink);
        create_task(&mut sched, spin, 1, &mut sink);
        let uptime = AtomicU32::new(0);

        let sp = sched.first_stack_pointer().unwrap();
        // Task 0 yields before its period ends
        let next = tick(&mut sched, &uptime, false, sp);

        assert_eq!(sched.current_task, 1);
        assert_eq!(next, sched.tasks[1].stack_pointer);
        assert_eq!(uptime.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_genuine_tick_advances_uptime() {
        let mut arena = StackArena::new();
        let mut sched = Scheduler::new(&mut arena);
        let mut sink = Capture::default();
        create_task(&mut sched, spin, 0, &mut sink);
        create_task(&mut sched, spin, 1, &mut sink);
        let uptime = AtomicU32::new(0);

        let mut sp = sched.first_stack_pointer().unwrap();
        for wrapped in [true, false, false, true, true] {
            sp = tick(&mut sched, &uptime, wrapped, sp);
        }

        assert_eq!(uptime.load(Ordering::Relaxed), 3 * TICK_MS);
        assert_eq!(sched.current_task, 1);
    }
}
