//! # rrtos: Round-Robin Time-Slicing Kernel
//!
//! A minimal preemptive multitasking kernel for single-core ARM Cortex-M4
//! microcontrollers. A fixed set of tasks, registered once at startup, share
//! the CPU in strict rotation; every SysTick interrupt saves the running
//! task's full register file and resumes the next one.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   create_task() · start() · yield_now() · monitor      │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Stack Monitor    │  Collaborators    │
//! │  scheduler.rs│   monitor.rs       │  diag.rs          │
//! │  ─ create    │   ─ cadence        │  ─ Diagnostics    │
//! │  ─ switch    │   ─ report         │  ─ Clock          │
//! │  ─ scan      │                    │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │   Task Model (task.rs) · Context Frame (context.rs)    │
//! │   Stack Arena (arena.rs) · Tick Parameters (timer.rs)  │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │    SysTick · Context Switch · First Task Launch        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed-size TCB array**: `[TaskControlBlock; MAX_TASKS]`
//! - **Stack arena**: one block split into per-slot regions of
//!   `STACK_SIZES[slot]` bytes, sentinel-filled at task creation
//! - **No isolation**: tasks share one flat address space; a stack overflow
//!   is only detected after the fact by the stack monitor
//!
//! Only `arch` depends on the hardware. The rest builds and tests on the host.

#![no_std]

#[cfg(all(bare_metal, target_abi = "eabihf"))]
compile_error!("hard-float targets are unsupported: the context switch does not save FPU state");

pub mod arena;
pub mod config;
pub mod context;
pub mod diag;
pub mod kernel;
pub mod monitor;
pub mod scheduler;
pub mod task;
pub mod timer;

#[cfg(bare_metal)]
pub mod arch;
#[cfg(bare_metal)]
pub mod sync;
