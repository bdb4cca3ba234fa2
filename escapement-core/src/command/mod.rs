//! Text command handling
//!
//! Commands arrive from the message bus as short text payloads such as
//! `stop`, `vetinari`, `sprint 80` or `calibrate 30`.

mod interpreter;
mod parse;

pub use interpreter::{CommandInterpreter, Timing};
pub use parse::{parse_command, parse_command_bytes, Command, CommandError};
