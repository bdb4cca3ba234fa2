//! Board-agnostic core logic for the clock driver
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Collaborator traits (coil driver, time source, timer)
//! - Tick mode registry and per-minute schedule generation
//! - Pulse engine and hand position bookkeeping
//! - Minute/revolution synchronizer state machine
//! - Text command parsing and interpretation
//! - Bridge link health monitoring
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod error;
pub mod link;
pub mod mode;
pub mod pulse;
pub mod schedule;
pub mod sync;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{parse_command, Command, CommandError, CommandInterpreter};
pub use config::{ClockConfig, MovementConfig, MINUTE_MS, PULSES_PER_REVOLUTION, SCHEDULE_LEN};
pub use error::{ConfigError, ScheduleError};
pub use link::{LinkAction, LinkMonitor, LinkStatus};
pub use mode::{ModeClass, TickMode};
pub use sync::{ClockEvent, Phase, RuntimeState, Step, Synchronizer};
