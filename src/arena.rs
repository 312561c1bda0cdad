//! # Stack Arena
//!
//! One statically sized block of RAM carved into per-slot stack regions.
//! Regions are laid out back to back in slot order, so they are disjoint by
//! construction and never move once the arena is placed in memory.

use crate::config::{ARENA_BYTES, MAX_TASKS, STACK_SIZES};

/// Backing memory for every task stack.
///
/// Aligned to 8 bytes; since every configured size is a multiple of 8, each
/// region base and top is 8-aligned as well.
#[repr(C, align(8))]
pub struct StackArena {
    mem: [u8; ARENA_BYTES],
}

impl StackArena {
    pub const fn new() -> Self {
        Self { mem: [0; ARENA_BYTES] }
    }

    /// Split the arena into one region per slot, in slot order.
    pub fn regions(&mut self) -> [StackRegion; MAX_TASKS] {
        let base = self.mem.as_mut_ptr();
        let mut regions = [StackRegion::EMPTY; MAX_TASKS];
        let mut offset = 0;
        for (slot, region) in regions.iter_mut().enumerate() {
            // SAFETY: the offsets sum to at most ARENA_BYTES
            *region = StackRegion {
                base: unsafe { base.add(offset) },
                len: STACK_SIZES[slot],
            };
            offset += STACK_SIZES[slot];
        }
        regions
    }
}

impl Default for StackArena {
    fn default() -> Self {
        Self::new()
    }
}

/// A task's exclusive stack memory `[base, base + len)`.
///
/// The stack grows down from `top()` towards `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    base: *mut u8,
    len: usize,
}

impl StackRegion {
    pub const EMPTY: Self = Self {
        base: core::ptr::null_mut(),
        len: 0,
    };

    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the highest byte of the region.
    #[inline]
    pub fn top(&self) -> *mut u8 {
        self.base.wrapping_add(self.len)
    }

    /// True if `ptr` lies within `[base, base + len)`.
    pub fn contains<T>(&self, ptr: *const T) -> bool {
        let addr = ptr as usize;
        addr >= self.base as usize && addr < self.top() as usize
    }

    /// Overwrite the whole region with `byte`.
    ///
    /// # Safety
    /// No live stack may be using the region.
    pub unsafe fn fill(&self, byte: u8) {
        core::ptr::write_bytes(self.base, byte, self.len);
    }

    /// Offset of the first byte, scanning up from `base`, that is not
    /// `sentinel`. Returns `len` when the region is untouched.
    ///
    /// # Safety
    /// The region must point to readable memory. The owning task may be
    /// writing to it concurrently from the scanner's point of view, so bytes
    /// are read volatile.
    pub unsafe fn first_dirty_offset(&self, sentinel: u8) -> usize {
        (0..self.len)
            .find(|&i| core::ptr::read_volatile(self.base.add(i)) != sentinel)
            .unwrap_or(self.len)
    }
}
