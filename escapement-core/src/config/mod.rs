//! Configuration types
//!
//! Defines all configuration structures for the clock driver.
//! Firmware builds fill these from the embedded `clock.toml`.

mod hardware;
mod movement;

pub use hardware::*;
pub use movement::*;

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete clock configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockConfig {
    pub movement: MovementConfig,
    pub coil: CoilConfig,
    pub link: LinkConfig,
}

impl ClockConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.movement.validate()?;
        self.coil.validate()?;
        self.link.validate()
    }
}
