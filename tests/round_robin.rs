//! End-to-end tests of the portable kernel core: registration, rotation,
//! and stack monitoring, driven the way the SysTick handler drives them.

use std::fmt;

use rrtos::arena::StackArena;
use rrtos::config::{MAX_TASKS, STACK_SIZES};
use rrtos::context::{self, FRAME_BYTES};
use rrtos::diag::Diagnostics;
use rrtos::kernel;
use rrtos::monitor::StackMonitor;
use rrtos::scheduler::Scheduler;
use rrtos::task::TaskState;

#[derive(Default)]
struct Lines(Vec<String>);

impl Diagnostics for Lines {
    fn line(&mut self, args: fmt::Arguments<'_>) {
        self.0.push(args.to_string());
    }
}

extern "C" fn counter_0() -> ! {
    loop {}
}
extern "C" fn counter_1() -> ! {
    loop {}
}
extern "C" fn counter_2() -> ! {
    loop {}
}
extern "C" fn counter_3() -> ! {
    loop {}
}

/// Stand-in for the hardware: the task being resumed "runs" one loop
/// iteration, then the tick captures its (unchanged) frame.
fn tick(sched: &mut Scheduler<'_>, sp: *mut u32, counters: &mut [u32; MAX_TASKS]) -> *mut u32 {
    let (regs, task_sp) = unsafe { context::pop_frame(sp) };
    counters[sched.current_task] += 1;
    let saved = unsafe { context::push_frame(task_sp, &regs) };
    sched.switch_context(saved)
}

#[test]
fn four_counting_tasks_all_make_progress() {
    let mut arena = StackArena::new();
    let mut sched = Scheduler::new(&mut arena);
    let mut diag = Lines::default();

    kernel::create_task(&mut sched, counter_0, 0, &mut diag);
    kernel::create_task(&mut sched, counter_1, 1, &mut diag);
    kernel::create_task(&mut sched, counter_2, 2, &mut diag);
    kernel::create_task(&mut sched, counter_3, 3, &mut diag);
    assert!(diag.0.is_empty());
    assert_eq!(sched.task_count, 4);

    let mut counters = [0u32; MAX_TASKS];
    let mut sp = sched.first_stack_pointer().expect("tasks registered");
    for _ in 0..4 {
        sp = tick(&mut sched, sp, &mut counters);
    }

    assert!(counters.iter().all(|&n| n >= 1), "counters: {counters:?}");
    assert_eq!(sched.current_task, 0);
    for tcb in &sched.tasks {
        assert!(tcb.region.contains(tcb.stack_pointer));
    }
}

#[test]
fn fairness_over_many_rounds() {
    let mut arena = StackArena::new();
    let mut sched = Scheduler::new(&mut arena);
    for (slot, entry) in [counter_0, counter_1, counter_2, counter_3].into_iter().enumerate() {
        sched.create_task(entry, slot).unwrap();
    }

    let mut counters = [0u32; MAX_TASKS];
    let mut sp = sched.first_stack_pointer().unwrap();
    for _ in 0..(MAX_TASKS * 25) {
        sp = tick(&mut sched, sp, &mut counters);
    }

    assert_eq!(counters, [25; MAX_TASKS]);
    assert!(sched
        .tasks
        .iter()
        .filter(|t| t.state == TaskState::Running)
        .count()
        == 1);
}

#[test]
fn rejected_registration_is_reported_not_applied() {
    let mut arena = StackArena::new();
    let mut sched = Scheduler::new(&mut arena);
    let mut diag = Lines::default();

    kernel::create_task(&mut sched, counter_0, MAX_TASKS, &mut diag);

    assert_eq!(sched.task_count, 0);
    assert_eq!(diag.0, ["Task 4 not created: task index out of bounds"]);
    assert!(sched.first_stack_pointer().is_none());
}

#[test]
fn monitor_reports_deep_excursion_after_unwind() {
    let mut arena = StackArena::new();
    let mut sched = Scheduler::new(&mut arena);
    sched.create_task(counter_0, 0).unwrap();
    sched.create_task(counter_1, 1).unwrap();

    // Task 1 pushes 120 bytes below its frame, then returns to frame depth
    let region = sched.tasks[1].region;
    let frame_base = STACK_SIZES[1] - FRAME_BYTES;
    for offset in frame_base - 120..frame_base {
        unsafe { region.base().add(offset).write(0x42) };
    }

    let mut monitor = StackMonitor::new(5000);
    let mut diag = Lines::default();
    assert!(monitor.poll(5000, |slot| sched.scan_stack(slot), &mut diag));

    let used_1 = FRAME_BYTES + 120;
    assert!(diag.0.contains(&format!(
        "Task 0: {} bytes used, {} free",
        FRAME_BYTES,
        STACK_SIZES[0] - FRAME_BYTES
    )));
    assert!(diag.0.contains(&format!(
        "Task 1: {} bytes used, {} free",
        used_1,
        STACK_SIZES[1] - used_1
    )));
    assert_eq!(sched.tasks[1].high_water_mark, FRAME_BYTES + 120);
}
