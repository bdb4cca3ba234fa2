//! Command parser

use core::fmt;

use crate::config::PULSES_PER_REVOLUTION;
use crate::mode::TickMode;

/// A parsed control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Stop immediately
    Stop,
    /// Start immediately, unsynchronized, from position zero
    Start,
    /// Start at the next minute boundary
    StartAtMinute,
    /// Stop when the current revolution completes
    StopAtTop,
    /// Select a mode; `tick_ms` is only accepted for positioning modes
    Mode { mode: TickMode, tick_ms: Option<u32> },
    /// The hand is at `position`; sprint it to the reference position
    Calibrate { position: u16, tick_ms: Option<u32> },
}

/// Why a command was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Nothing but whitespace
    Empty,
    /// Not a keyword or mode name
    UnknownCommand,
    /// A required argument is missing
    MissingArgument,
    /// An argument is not a decimal number
    InvalidNumber,
    /// Calibration position is not on the dial
    PositionOutOfRange(u32),
    /// Arguments left over after a complete command
    UnexpectedArgument,
    /// Payload is not valid UTF-8
    InvalidUtf8,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty command"),
            CommandError::UnknownCommand => f.write_str("unknown command"),
            CommandError::MissingArgument => f.write_str("missing argument"),
            CommandError::InvalidNumber => f.write_str("invalid number"),
            CommandError::PositionOutOfRange(position) => {
                write!(f, "position {} out of range", position)
            }
            CommandError::UnexpectedArgument => f.write_str("unexpected argument"),
            CommandError::InvalidUtf8 => f.write_str("payload is not UTF-8"),
        }
    }
}

/// Parse a command from raw payload bytes
pub fn parse_command_bytes(payload: &[u8]) -> Result<Command, CommandError> {
    let text = core::str::from_utf8(payload).map_err(|_| CommandError::InvalidUtf8)?;
    parse_command(text)
}

/// Parse a command
///
/// Keywords and mode names are matched exactly. Surrounding whitespace is
/// ignored, as are runs of whitespace between words.
pub fn parse_command(text: &str) -> Result<Command, CommandError> {
    let mut words = text.split_whitespace();
    let keyword = words.next().ok_or(CommandError::Empty)?;

    let command = match keyword {
        "stop" => Command::Stop,
        "start" => Command::Start,
        "start_at_minute" => Command::StartAtMinute,
        "stop_at_top" => Command::StopAtTop,
        "calibrate" => {
            let position = parse_number(words.next().ok_or(CommandError::MissingArgument)?)?;
            let position = u16::try_from(position)
                .ok()
                .filter(|&p| p < PULSES_PER_REVOLUTION)
                .ok_or(CommandError::PositionOutOfRange(position))?;
            let tick_ms = words.next().map(parse_number).transpose()?;
            Command::Calibrate { position, tick_ms }
        }
        name => {
            let mode = TickMode::from_name(name).ok_or(CommandError::UnknownCommand)?;
            let tick_ms = if mode.is_positioning() {
                words.next().map(parse_number).transpose()?
            } else {
                None
            };
            Command::Mode { mode, tick_ms }
        }
    };

    if words.next().is_some() {
        return Err(CommandError::UnexpectedArgument);
    }
    Ok(command)
}

fn parse_number(word: &str) -> Result<u32, CommandError> {
    word.parse().map_err(|_| CommandError::InvalidNumber)
}
