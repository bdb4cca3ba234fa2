//! Per-minute pulse schedules
//!
//! Turns the active tick mode into the 59 intervals that carry the hand
//! from the boundary pulse to the reference position.

mod generator;
pub mod templates;

pub use generator::{PulseSchedule, ScheduleGenerator};
