//! Hardware abstraction traits
//!
//! These traits define the interface between the scheduling logic
//! and the board: the coil, wall-clock time, and the monotonic timer.

pub mod coil;
pub mod time;

pub use coil::CoilDriver;
pub use time::{Monotonic, TimeSource, Timer};
