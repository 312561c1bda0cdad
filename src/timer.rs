//! # Tick Timer Parameters
//!
//! Derives the SysTick programming (clock source and reload) for a target
//! tick rate. Evaluated at compile time from `config`, so a tick rate the
//! hardware cannot produce fails the build.

use core::fmt;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ, TICK_PRESCALE};

/// Largest value the 24-bit SysTick reload register accepts.
pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Clock feeding the tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescale {
    /// Processor clock.
    Div1,
    /// Implementation reference clock; HCLK/8 on STM32F4.
    Div8,
}

impl Prescale {
    pub const fn from_divisor(divisor: u32) -> Result<Self, TimerError> {
        match divisor {
            1 => Ok(Self::Div1),
            8 => Ok(Self::Div8),
            _ => Err(TimerError::UnsupportedPrescale),
        }
    }

    pub const fn divisor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div8 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Tick rate of zero.
    ZeroTickRate,
    /// Divisor other than 1 or 8.
    UnsupportedPrescale,
    /// Tick period is shorter than one counter step, or longer than the
    /// 24-bit reload allows.
    ReloadOutOfRange,
}

impl TimerError {
    pub const fn message(self) -> &'static str {
        match self {
            Self::ZeroTickRate => "tick rate must be non-zero",
            Self::UnsupportedPrescale => "prescale must be 1 or 8",
            Self::ReloadOutOfRange => "tick period outside the reload range",
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// SysTick programming for one tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickConfig {
    pub prescale: Prescale,
    /// Counter steps per tick, minus one.
    pub reload: u32,
}

impl TickConfig {
    pub const fn derive(clock_hz: u32, prescale: u32, tick_hz: u32) -> Result<Self, TimerError> {
        if tick_hz == 0 {
            return Err(TimerError::ZeroTickRate);
        }
        let prescale = match Prescale::from_divisor(prescale) {
            Ok(p) => p,
            Err(e) => return Err(e),
        };
        let steps = clock_hz / prescale.divisor() / tick_hz;
        if steps == 0 || steps - 1 > MAX_RELOAD {
            return Err(TimerError::ReloadOutOfRange);
        }
        Ok(Self {
            prescale,
            reload: steps - 1,
        })
    }

    /// Milliseconds covered by one tick, rounded down.
    pub const fn period_ms(&self, clock_hz: u32) -> u32 {
        let steps = (self.reload as u64 + 1) * self.prescale.divisor() as u64;
        (steps * 1000 / clock_hz as u64) as u32
    }
}

/// Tick programming for the configured clock and tick rate.
pub const TICK: TickConfig = match TickConfig::derive(SYSTEM_CLOCK_HZ, TICK_PRESCALE, TICK_HZ) {
    Ok(config) => config,
    // Fails the build with the reason, e.g. "prescale must be 1 or 8"
    Err(err) => panic!("{}", err.message()),
};

/// Whole milliseconds per tick; the uptime clock advances by this much.
pub const TICK_MS: u32 = TICK.period_ms(SYSTEM_CLOCK_HZ);

const _: () = assert!(TICK_MS > 0, "tick period must be at least 1 ms");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_millisecond_at_16mhz() {
        let tick = TickConfig::derive(16_000_000, 8, 1000).unwrap();
        assert_eq!(tick.prescale, Prescale::Div8);
        assert_eq!(tick.reload, 1999);
        assert_eq!(tick.period_ms(16_000_000), 1);
    }

    #[test]
    fn test_configured_tick() {
        assert_eq!(TICK.period_ms(SYSTEM_CLOCK_HZ), 1000 / TICK_HZ);
        assert_eq!(TICK_MS, 1);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(TickConfig::derive(16_000_000, 8, 0), Err(TimerError::ZeroTickRate));
        assert_eq!(TickConfig::derive(16_000_000, 64, 1000), Err(TimerError::UnsupportedPrescale));
        // 168 MHz / 1 Hz needs a reload of 168M - 1, beyond 24 bits
        assert_eq!(TickConfig::derive(168_000_000, 1, 1), Err(TimerError::ReloadOutOfRange));
        assert_eq!(TickConfig::derive(1000, 8, 1000), Err(TimerError::ReloadOutOfRange));
    }

    #[test]
    fn test_error_messages() {
        extern crate std;
        use std::string::ToString;

        let err = TickConfig::derive(16_000_000, 64, 1000).unwrap_err();
        assert_eq!(err.to_string(), "prescale must be 1 or 8");
        assert_eq!(err.to_string(), err.message());
        assert_eq!(TimerError::ZeroTickRate.to_string(), "tick rate must be non-zero");
        assert_eq!(
            TimerError::ReloadOutOfRange.to_string(),
            "tick period outside the reload range"
        );
    }
}
