//! Message types for the bridge link
//!
//! Bridge → clock: commands, time samples, heartbeat, bus state.
//! Clock → bridge: mode status, log lines, resync and reconnect requests,
//! heartbeat replies.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};

// Message type IDs: bridge → clock
pub const MSG_COMMAND: u8 = 0x01;
pub const MSG_TIME_SYNC: u8 = 0x02;
pub const MSG_PING: u8 = 0x03;
pub const MSG_BUS_STATE: u8 = 0x04;

// Message type IDs: clock → bridge
pub const MSG_MODE: u8 = 0x20;
pub const MSG_LOG: u8 = 0x21;
pub const MSG_TIME_REQUEST: u8 = 0x22;
pub const MSG_RECONNECT: u8 = 0x23;
pub const MSG_PONG: u8 = 0x24;

/// NTP sample relayed by the bridge
///
/// `ntp_seconds`/`ntp_fraction` are the server's transmit timestamp;
/// `round_trip_ms` is the bridge's measured request round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeSync {
    pub ntp_seconds: u32,
    pub ntp_fraction: u32,
    pub round_trip_ms: u32,
}

/// Messages from the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeMessage<'a> {
    /// Raw command text from the message bus
    Command(&'a [u8]),
    TimeSync(TimeSync),
    /// Heartbeat request
    Ping,
    /// Whether the bridge is connected to the message bus
    BusState { connected: bool },
}

impl<'a> BridgeMessage<'a> {
    pub fn from_frame(frame: &'a Frame) -> Result<Self, FrameError> {
        match frame.kind {
            MSG_COMMAND => Ok(BridgeMessage::Command(&frame.payload)),
            MSG_TIME_SYNC => postcard::from_bytes(&frame.payload)
                .map(BridgeMessage::TimeSync)
                .map_err(|_| FrameError::InvalidPayload),
            MSG_PING => Ok(BridgeMessage::Ping),
            MSG_BUS_STATE => match frame.payload.as_slice() {
                [state] => Ok(BridgeMessage::BusState {
                    connected: *state != 0,
                }),
                _ => Err(FrameError::InvalidPayload),
            },
            other => Err(FrameError::UnknownType(other)),
        }
    }

    /// Encode this message into a frame (for the bridge side and tests)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            BridgeMessage::Command(text) => Frame::new(MSG_COMMAND, text),
            BridgeMessage::TimeSync(sample) => {
                let mut buffer = [0u8; 16];
                let used = postcard::to_slice(sample, &mut buffer)
                    .map_err(|_| FrameError::BufferTooSmall)?;
                Frame::new(MSG_TIME_SYNC, used)
            }
            BridgeMessage::Ping => Ok(Frame::empty(MSG_PING)),
            BridgeMessage::BusState { connected } => {
                Frame::new(MSG_BUS_STATE, &[u8::from(*connected)])
            }
        }
    }
}

/// Messages to the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMessage<'a> {
    /// Current mode name, to be published on the bus
    Mode { name: &'a str, retained: bool },
    /// Line for the remote log; truncated to fit a frame
    Log(&'a str),
    /// Ask for a fresh NTP sample
    TimeRequest,
    /// Ask the bridge to reconnect to the message bus
    Reconnect,
    /// Heartbeat response
    Pong,
}

impl<'a> ClockMessage<'a> {
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            ClockMessage::Mode { name, retained } => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                payload
                    .push(u8::from(*retained))
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                payload
                    .extend_from_slice(name.as_bytes())
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Frame::new(MSG_MODE, &payload)
            }
            ClockMessage::Log(line) => {
                Frame::new(MSG_LOG, truncate(line, MAX_PAYLOAD_SIZE).as_bytes())
            }
            ClockMessage::TimeRequest => Ok(Frame::empty(MSG_TIME_REQUEST)),
            ClockMessage::Reconnect => Ok(Frame::empty(MSG_RECONNECT)),
            ClockMessage::Pong => Ok(Frame::empty(MSG_PONG)),
        }
    }

    /// Decode a frame sent by the clock (for the bridge side and tests)
    pub fn from_frame(frame: &'a Frame) -> Result<Self, FrameError> {
        let text = |bytes: &'a [u8]| {
            core::str::from_utf8(bytes).map_err(|_| FrameError::InvalidPayload)
        };
        match frame.kind {
            MSG_MODE => match frame.payload.split_first() {
                Some((&retained, name)) => Ok(ClockMessage::Mode {
                    name: text(name)?,
                    retained: retained != 0,
                }),
                None => Err(FrameError::InvalidPayload),
            },
            MSG_LOG => Ok(ClockMessage::Log(text(&frame.payload)?)),
            MSG_TIME_REQUEST => Ok(ClockMessage::TimeRequest),
            MSG_RECONNECT => Ok(ClockMessage::Reconnect),
            MSG_PONG => Ok(ClockMessage::Pong),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// Longest prefix of `text` that fits `max` bytes without splitting a char
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_frame() {
        let frame = Frame::new(MSG_COMMAND, b"calibrate 30").unwrap();
        assert_eq!(
            BridgeMessage::from_frame(&frame),
            Ok(BridgeMessage::Command(b"calibrate 30"))
        );
    }

    #[test]
    fn test_time_sync_decodes() {
        let sample = TimeSync {
            ntp_seconds: 3_913_056_000,
            ntp_fraction: 1 << 31,
            round_trip_ms: 42,
        };
        let frame = BridgeMessage::TimeSync(sample).to_frame().unwrap();
        assert_eq!(frame.kind, MSG_TIME_SYNC);
        assert_eq!(
            BridgeMessage::from_frame(&frame),
            Ok(BridgeMessage::TimeSync(sample))
        );
    }

    #[test]
    fn test_truncated_time_sync_rejected() {
        let frame = Frame::new(MSG_TIME_SYNC, &[0x80]).unwrap();
        assert_eq!(
            BridgeMessage::from_frame(&frame),
            Err(FrameError::InvalidPayload)
        );
    }

    #[test]
    fn test_bus_state() {
        let frame = Frame::new(MSG_BUS_STATE, &[0]).unwrap();
        assert_eq!(
            BridgeMessage::from_frame(&frame),
            Ok(BridgeMessage::BusState { connected: false })
        );
        let empty = Frame::empty(MSG_BUS_STATE);
        assert_eq!(
            BridgeMessage::from_frame(&empty),
            Err(FrameError::InvalidPayload)
        );
    }

    #[test]
    fn test_unknown_type() {
        let frame = Frame::empty(MSG_PONG);
        assert_eq!(
            BridgeMessage::from_frame(&frame),
            Err(FrameError::UnknownType(MSG_PONG))
        );
    }

    #[test]
    fn test_mode_frame_layout() {
        let msg = ClockMessage::Mode {
            name: "vetinari",
            retained: true,
        };
        let frame = msg.to_frame().unwrap();
        assert_eq!(frame.kind, MSG_MODE);
        assert_eq!(frame.payload[0], 1);
        assert_eq!(&frame.payload[1..], b"vetinari");
        assert_eq!(ClockMessage::from_frame(&frame), Ok(msg));
    }

    #[test]
    fn test_long_log_line_truncated() {
        let mut line = heapless::String::<300>::new();
        for _ in 0..MAX_PAYLOAD_SIZE - 1 {
            line.push('a').unwrap();
        }
        // Two-byte char straddling the limit
        line.push('é').unwrap();

        let frame = ClockMessage::Log(&line).to_frame().unwrap();
        assert_eq!(frame.payload.len(), MAX_PAYLOAD_SIZE - 1);
        assert!(core::str::from_utf8(&frame.payload).is_ok());
    }

    #[test]
    fn test_empty_requests() {
        for (msg, kind) in [
            (ClockMessage::TimeRequest, MSG_TIME_REQUEST),
            (ClockMessage::Reconnect, MSG_RECONNECT),
            (ClockMessage::Pong, MSG_PONG),
        ] {
            let frame = msg.to_frame().unwrap();
            assert_eq!(frame.kind, kind);
            assert!(frame.payload.is_empty());
        }
    }
}
