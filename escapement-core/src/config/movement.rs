//! Movement timing configuration

use crate::error::ConfigError;
use crate::mode::TickMode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pulses needed to take the hand once around the dial
pub const PULSES_PER_REVOLUTION: u16 = 60;

/// Intervals in one minute's schedule
///
/// The last pulse of every revolution is fired on the minute boundary
/// itself and never comes from the table.
pub const SCHEDULE_LEN: usize = PULSES_PER_REVOLUTION as usize - 1;

/// Length of a wall-clock minute, as every time source reports it
pub const MINUTE_MS: u32 = 60_000;

/// Longest coil pulse accepted by validation
pub const MAX_PULSE_MS: u32 = 250;

/// Timing parameters for the movement and the synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MovementConfig {
    /// Coil energize time per pulse
    pub pulse_ms: u32,
    /// Headroom a schedule must leave before the next boundary
    pub safety_margin_ms: u32,
    /// The boundary pulse fires once the time source reports fewer
    /// milliseconds into the minute than this
    pub boundary_window_ms: u32,
    /// Rollover window for a pending start-at-minute
    pub start_window_ms: u32,
    /// Waits shorter than this are taken as a blocking sleep instead of
    /// being handed back to the main loop as idle time
    pub boundary_lead_ms: u32,
    /// How long a synchronized start waits for the first time sample
    pub time_sync_timeout_ms: u32,
    pub steady_tick_ms: u32,
    pub rush_tick_ms: u32,
    pub sprint_tick_ms: u32,
    pub crawl_tick_ms: u32,
    /// Positioning tick for calibration sprints without an explicit delay
    pub calibrate_tick_ms: u32,
    /// Mode selected at power-on (must be a timekeeping mode)
    pub default_mode: TickMode,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            pulse_ms: 30,
            safety_margin_ms: 200,
            boundary_window_ms: 500,
            start_window_ms: 1000,
            boundary_lead_ms: 200,
            time_sync_timeout_ms: 10_000,
            steady_tick_ms: 1000,
            rush_tick_ms: 800,
            sprint_tick_ms: 100,
            crawl_tick_ms: 1500,
            calibrate_tick_ms: 100,
            default_mode: TickMode::Vetinari,
        }
    }
}

impl MovementConfig {
    /// Time a timekeeping schedule may use
    pub fn budget_ms(&self) -> u32 {
        MINUTE_MS.saturating_sub(self.safety_margin_ms)
    }

    /// Shortest positioning tick: one pulse plus an equally long rest
    pub fn min_positioning_tick_ms(&self) -> u32 {
        self.pulse_ms.saturating_mul(2)
    }

    /// Clamp a requested positioning tick to the minimum
    pub fn clamp_positioning_tick(&self, tick_ms: u32) -> u32 {
        tick_ms.max(self.min_positioning_tick_ms())
    }

    /// Check the parameters are usable
    ///
    /// Schedule sums are not checked here; the generator rejects an
    /// overrunning schedule when the mode is activated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulse_ms == 0 || self.pulse_ms > MAX_PULSE_MS {
            return Err(ConfigError::PulseLength(self.pulse_ms));
        }
        if self.safety_margin_ms >= MINUTE_MS {
            return Err(ConfigError::MarginExceedsMinute);
        }
        if self.boundary_window_ms == 0 || self.boundary_window_ms > self.start_window_ms {
            return Err(ConfigError::BoundaryWindow);
        }
        if self.start_window_ms >= MINUTE_MS / 2 {
            return Err(ConfigError::BoundaryWindow);
        }
        for tick_ms in [self.steady_tick_ms, self.rush_tick_ms] {
            if tick_ms <= self.pulse_ms {
                return Err(ConfigError::TickShorterThanPulse(tick_ms));
            }
        }
        for tick_ms in [self.sprint_tick_ms, self.crawl_tick_ms, self.calibrate_tick_ms] {
            if tick_ms < self.min_positioning_tick_ms() {
                return Err(ConfigError::TickShorterThanPulse(tick_ms));
            }
        }
        if !self.default_mode.is_timekeeping() {
            return Err(ConfigError::DefaultModeNotTimekeeping);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MovementConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.budget_ms(), 59_800);
        assert_eq!(SCHEDULE_LEN, 59);
    }

    #[test]
    fn test_positioning_clamp() {
        let config = MovementConfig::default();
        assert_eq!(config.min_positioning_tick_ms(), 60);
        assert_eq!(config.clamp_positioning_tick(10), 60);
        assert_eq!(config.clamp_positioning_tick(250), 250);
    }

    #[test]
    fn test_rejects_bad_pulse() {
        let config = MovementConfig {
            pulse_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PulseLength(0)));
    }

    #[test]
    fn test_rejects_tick_shorter_than_pulse() {
        let config = MovementConfig {
            rush_tick_ms: 20,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TickShorterThanPulse(20)));
    }

    #[test]
    fn test_rejects_positioning_default_mode() {
        let config = MovementConfig {
            default_mode: TickMode::Crawl,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DefaultModeNotTimekeeping));
    }

    #[test]
    fn test_rejects_margin_covering_minute() {
        let config = MovementConfig {
            safety_margin_ms: MINUTE_MS,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MarginExceedsMinute));
    }

    #[test]
    fn test_rejects_inverted_windows() {
        let config = MovementConfig {
            boundary_window_ms: 1500,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BoundaryWindow));
    }
}
