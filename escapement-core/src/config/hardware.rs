//! Hardware and link configuration types
//!
//! Pin numbers, output drive, and the bridge link timing.

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest GPIO number on the RP2040
pub const MAX_GPIO: u8 = 29;

/// Output drive strength for the coil pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DriveStrength {
    /// 2 mA, enough for most Lavet coils
    #[default]
    Ma2,
    Ma4,
    Ma8,
    Ma12,
}

impl DriveStrength {
    /// Parse from the milliamp value used in config files
    pub fn from_ma(ma: u8) -> Option<Self> {
        match ma {
            2 => Some(DriveStrength::Ma2),
            4 => Some(DriveStrength::Ma4),
            8 => Some(DriveStrength::Ma8),
            12 => Some(DriveStrength::Ma12),
            _ => None,
        }
    }

    pub fn ma(self) -> u8 {
        match self {
            DriveStrength::Ma2 => 2,
            DriveStrength::Ma4 => 4,
            DriveStrength::Ma8 => 8,
            DriveStrength::Ma12 => 12,
        }
    }
}

/// Coil wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoilConfig {
    /// GPIO driven high on even pulses
    pub pin_a: u8,
    /// GPIO driven high on odd pulses
    pub pin_b: u8,
    pub drive: DriveStrength,
}

impl Default for CoilConfig {
    fn default() -> Self {
        Self {
            pin_a: 2,
            pin_b: 3,
            drive: DriveStrength::Ma2,
        }
    }
}

impl CoilConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pin_a > MAX_GPIO || self.pin_b > MAX_GPIO {
            return Err(ConfigError::InvalidPin);
        }
        if self.pin_a == self.pin_b {
            return Err(ConfigError::InvalidPin);
        }
        Ok(())
    }
}

/// Bridge link and time resync timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// A heartbeat is counted as missed after this long
    pub heartbeat_timeout_ms: u32,
    /// Missed heartbeats before the link is considered lost
    pub max_missed_heartbeats: u8,
    /// Fixed retry interval for reconnect and time requests
    pub reconnect_backoff_ms: u32,
    /// Interval between routine time resyncs
    pub resync_interval_ms: u32,
    /// Time source is treated as unsynced this long after the last sample
    pub stale_after_ms: u32,
    /// Smallest idle window in which blocking link work is allowed
    pub min_idle_slack_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 3000,
            max_missed_heartbeats: 3,
            reconnect_backoff_ms: 5000,
            resync_interval_ms: 3_600_000,
            stale_after_ms: 21_600_000,
            min_idle_slack_ms: 2000,
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_timeout_ms == 0 || self.max_missed_heartbeats == 0 {
            return Err(ConfigError::LinkTiming);
        }
        if self.reconnect_backoff_ms == 0 || self.resync_interval_ms > self.stale_after_ms {
            return Err(ConfigError::LinkTiming);
        }
        Ok(())
    }
}
