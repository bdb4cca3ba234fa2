//! Bridge link protocol
//!
//! The clock has no network stack of its own. A companion board (the
//! bridge) owns Wi-Fi, NTP and the message bus, and talks to the clock
//! over a UART using small binary frames:
//!
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ LENGTH │ TYPE │ PAYLOAD     │ CHECKSUM │
//! │ 0x7E  │ 1B     │ 1B   │ 0–250B      │ 1B       │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! The checksum is the XOR of LENGTH, TYPE and every payload byte.

#![no_std]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;

pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{BridgeMessage, ClockMessage, TimeSync};
