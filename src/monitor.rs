//! # Stack Monitor
//!
//! Periodic stack high-water-mark reporting. The monitor is an ordinary task:
//! it asks the scheduler to scan each stack region for the deepest byte that
//! no longer holds the sentinel and prints the result through the
//! diagnostics sink. It never influences scheduling.
//!
//! The scan is a heuristic. It sees the deepest excursion whose writes are
//! still in memory; an excursion that wrote back sentinel-valued bytes is
//! invisible.

use crate::config::MAX_TASKS;
use crate::diag::Diagnostics;

/// One stack scan result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Watermark {
    pub slot: usize,
    /// Deepest usage in bytes, measured from the top of the region.
    pub used: usize,
    /// Region size in bytes.
    pub size: usize,
    /// Guard band dirty, or a saved stack pointer seen outside the region.
    pub overflow_suspected: bool,
}

impl Watermark {
    #[inline]
    pub fn free(&self) -> usize {
        self.size - self.used
    }
}

/// Uptime split into hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uptime {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Uptime {
    pub const fn from_ms(ms: u32) -> Self {
        let total = ms / 1000;
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

/// Report cadence. Deadlines advance by exactly one interval per report, so
/// a late report does not push later ones back.
pub struct StackMonitor {
    interval_ms: u32,
    last_report_ms: u32,
}

impl StackMonitor {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_report_ms: 0,
        }
    }

    /// True once `interval_ms` has passed since the last report deadline.
    /// Consumes the deadline when it returns true.
    pub fn due(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_report_ms) < self.interval_ms {
            return false;
        }
        self.last_report_ms = self.last_report_ms.wrapping_add(self.interval_ms);
        true
    }

    /// Report every registered task if a report is due.
    ///
    /// `scan` measures one slot and returns `None` for a vacant one. Returns
    /// whether a report was written.
    pub fn poll<S, D>(&mut self, now_ms: u32, mut scan: S, diag: &mut D) -> bool
    where
        S: FnMut(usize) -> Option<Watermark>,
        D: Diagnostics,
    {
        if !self.due(now_ms) {
            return false;
        }
        self.report_header(now_ms, diag);
        for slot in 0..MAX_TASKS {
            if let Some(mark) = scan(slot) {
                self.report_task(&mark, diag);
            }
        }
        true
    }

    fn report_header<D: Diagnostics>(&self, now_ms: u32, diag: &mut D) {
        let up = Uptime::from_ms(now_ms);
        diag.line(format_args!(""));
        diag.line(format_args!("***Monitor Task***"));
        diag.line(format_args!("Uptime: {}h {}m {}s", up.hours, up.minutes, up.seconds));
        diag.line(format_args!("Stack high water marks:"));
    }

    fn report_task<D: Diagnostics>(&self, mark: &Watermark, diag: &mut D) {
        diag.line(format_args!(
            "Task {}: {} bytes used, {} free",
            mark.slot,
            mark.used,
            mark.free()
        ));
        if mark.overflow_suspected {
            diag.line(format_args!("Task {}: stack overflow suspected", mark.slot));
        }
    }
}
