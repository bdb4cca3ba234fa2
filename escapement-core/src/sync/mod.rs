//! Minute and revolution synchronization
//!
//! This module contains the clock state machine:
//!
//! - Runtime state with named transitions
//! - The synchronizer that decides when each pulse fires
//! - Events reported back to the firmware

pub mod events;
mod state;
mod synchronizer;

pub use events::{ClockEvent, EventLog, ModeChange, StopReason};
pub use state::{Phase, RevolutionOutcome, RuntimeState};
pub use synchronizer::{Step, Synchronizer};
