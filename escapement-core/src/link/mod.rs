//! Bridge link health
//!
//! Tracks heartbeats from the network bridge and decides when to ask for a
//! fresh time sample or a reconnect.

pub mod monitor;

pub use monitor::{LinkAction, LinkMonitor, LinkStatus};
