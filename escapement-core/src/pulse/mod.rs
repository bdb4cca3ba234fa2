//! Pulse generation and hand position tracking

mod engine;

pub use engine::{HandPosition, PulseEngine};
