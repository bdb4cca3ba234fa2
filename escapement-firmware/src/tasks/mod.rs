//! Embassy async tasks
//!
//! A single task owns the coil and the bridge link so pulse timing never
//! waits on another task.

pub mod clock;

pub use clock::clock_task;
