//! Error types shared across the core

use core::fmt;

use crate::mode::TickMode;

/// Invalid configuration values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Pulse length is zero or longer than the driver allows
    PulseLength(u32),
    /// Safety margin leaves no room in the minute
    MarginExceedsMinute,
    /// Boundary and start windows are inconsistent
    BoundaryWindow,
    /// A tick is too short to fit the coil pulse
    TickShorterThanPulse(u32),
    /// Power-on mode is a positioning mode
    DefaultModeNotTimekeeping,
    /// Coil pins are out of range or shared
    InvalidPin,
    /// Link timeouts or intervals are zero or inconsistent
    LinkTiming,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PulseLength(ms) => write!(f, "pulse length {} ms out of range", ms),
            ConfigError::MarginExceedsMinute => f.write_str("safety margin exceeds the minute"),
            ConfigError::BoundaryWindow => f.write_str("boundary window exceeds start window"),
            ConfigError::TickShorterThanPulse(ms) => {
                write!(f, "tick of {} ms is too short for the pulse", ms)
            }
            ConfigError::DefaultModeNotTimekeeping => {
                f.write_str("default mode must be a timekeeping mode")
            }
            ConfigError::InvalidPin => f.write_str("invalid coil pin assignment"),
            ConfigError::LinkTiming => f.write_str("invalid link timing"),
        }
    }
}

/// Schedule generation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// The mode's intervals do not fit the minute budget
    Overrun {
        mode: TickMode,
        sum_ms: u32,
        budget_ms: u32,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Overrun {
                mode,
                sum_ms,
                budget_ms,
            } => write!(
                f,
                "{} schedule needs {} ms, budget is {} ms",
                mode, sum_ms, budget_ms
            ),
        }
    }
}
