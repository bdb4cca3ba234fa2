//! Tick modes
//!
//! Every mode is a tag plus a static behavior record; nothing outside
//! this module branches on individual modes.

mod registry;

pub use registry::{ConfiguredTick, ModeBehavior, ModeClass, Pattern, TickMode};
