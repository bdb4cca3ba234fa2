//! Mode registry
//!
//! Maps each [`TickMode`] to its name, its classification and the pattern
//! the schedule generator expands it into.

use core::fmt;

use crate::config::{MovementConfig, SCHEDULE_LEN};
use crate::schedule::templates::{
    HESITATE_BASE_MS, HESITATE_PAUSE_MS, STUMBLE_BASE_MS, STUMBLE_BURST_MS, VETINARI_TEMPLATE,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tick modes the movement can run in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TickMode {
    /// One pulse per second
    Steady,
    /// Short equal ticks, then an idle wait for the minute
    RushWait,
    /// Shuffled irregular ticks that still add up to a minute
    Vetinari,
    /// Regular ticks with one long pause somewhere in the minute
    Hesitate,
    /// Regular ticks with one quick double-step somewhere in the minute
    Stumble,
    /// Fast free-running positioning
    Sprint,
    /// Slow free-running positioning
    Crawl,
}

/// Whether a mode is locked to wall-clock minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ModeClass {
    /// One revolution per minute, anchored to the time source
    Timekeeping,
    /// Runs continuously and unsynchronized until stopped
    Positioning,
}

/// A tick length taken from [`MovementConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfiguredTick {
    Steady,
    Rush,
    Sprint,
    Crawl,
}

impl ConfiguredTick {
    /// Resolve against a configuration
    pub fn ms(self, config: &MovementConfig) -> u32 {
        match self {
            ConfiguredTick::Steady => config.steady_tick_ms,
            ConfiguredTick::Rush => config.rush_tick_ms,
            ConfiguredTick::Sprint => config.sprint_tick_ms,
            ConfiguredTick::Crawl => config.crawl_tick_ms,
        }
    }
}

/// How a mode turns into pulse intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Every interval equal to a configured tick length
    Uniform(ConfiguredTick),
    /// A fixed template, reshuffled every minute
    Shuffled(&'static [u32; SCHEDULE_LEN]),
    /// Equal intervals except for one outlier, reshuffled every minute
    Outlier { base_ms: u32, outlier_ms: u32 },
    /// No table; every pulse waits the active positioning tick.
    /// The configured tick applies when a command gives none.
    FreeRunning(ConfiguredTick),
}

/// Static description of a tick mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeBehavior {
    /// Name used in commands and status messages
    pub name: &'static str,
    pub class: ModeClass,
    pub pattern: Pattern,
}

const STEADY: ModeBehavior = ModeBehavior {
    name: "steady",
    class: ModeClass::Timekeeping,
    pattern: Pattern::Uniform(ConfiguredTick::Steady),
};

const RUSH_WAIT: ModeBehavior = ModeBehavior {
    name: "rush_wait",
    class: ModeClass::Timekeeping,
    pattern: Pattern::Uniform(ConfiguredTick::Rush),
};

const VETINARI: ModeBehavior = ModeBehavior {
    name: "vetinari",
    class: ModeClass::Timekeeping,
    pattern: Pattern::Shuffled(&VETINARI_TEMPLATE),
};

const HESITATE: ModeBehavior = ModeBehavior {
    name: "hesitate",
    class: ModeClass::Timekeeping,
    pattern: Pattern::Outlier {
        base_ms: HESITATE_BASE_MS,
        outlier_ms: HESITATE_PAUSE_MS,
    },
};

const STUMBLE: ModeBehavior = ModeBehavior {
    name: "stumble",
    class: ModeClass::Timekeeping,
    pattern: Pattern::Outlier {
        base_ms: STUMBLE_BASE_MS,
        outlier_ms: STUMBLE_BURST_MS,
    },
};

const SPRINT: ModeBehavior = ModeBehavior {
    name: "sprint",
    class: ModeClass::Positioning,
    pattern: Pattern::FreeRunning(ConfiguredTick::Sprint),
};

const CRAWL: ModeBehavior = ModeBehavior {
    name: "crawl",
    class: ModeClass::Positioning,
    pattern: Pattern::FreeRunning(ConfiguredTick::Crawl),
};

impl TickMode {
    /// Every mode, in registry order
    pub const ALL: [TickMode; 7] = [
        TickMode::Steady,
        TickMode::RushWait,
        TickMode::Vetinari,
        TickMode::Hesitate,
        TickMode::Stumble,
        TickMode::Sprint,
        TickMode::Crawl,
    ];

    /// Get the behavior record for this mode
    pub fn behavior(self) -> &'static ModeBehavior {
        match self {
            TickMode::Steady => &STEADY,
            TickMode::RushWait => &RUSH_WAIT,
            TickMode::Vetinari => &VETINARI,
            TickMode::Hesitate => &HESITATE,
            TickMode::Stumble => &STUMBLE,
            TickMode::Sprint => &SPRINT,
            TickMode::Crawl => &CRAWL,
        }
    }

    /// Look up a mode by its exact, case-sensitive name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    pub fn name(self) -> &'static str {
        self.behavior().name
    }

    pub fn class(self) -> ModeClass {
        self.behavior().class
    }

    pub fn is_timekeeping(self) -> bool {
        matches!(self.class(), ModeClass::Timekeeping)
    }

    pub fn is_positioning(self) -> bool {
        matches!(self.class(), ModeClass::Positioning)
    }

    /// Positioning tick used when none is given explicitly
    ///
    /// Returns `None` for timekeeping modes.
    pub fn default_positioning_tick_ms(self, config: &MovementConfig) -> Option<u32> {
        match self.behavior().pattern {
            Pattern::FreeRunning(tick) => Some(tick.ms(config)),
            _ => None,
        }
    }
}

impl fmt::Display for TickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
