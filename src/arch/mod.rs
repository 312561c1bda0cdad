//! # Architecture Port
//!
//! Hardware-specific half of the kernel: the tick timer, the context switch
//! handler and the first-task launch. Compiled for Thumb targets only; the
//! task table and dispatch policy they drive live in portable modules.

pub mod cortex_m4;
