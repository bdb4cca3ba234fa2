//! Minimal TOML parser for the clock configuration
//!
//! Handles only the subset `clock.toml` uses:
//! - `[movement]`, `[coil]` and `[link]` section headers
//! - `key = value` pairs with integer, quoted string or pin values
//! - Comments (`# ...`), whole-line or trailing
//!
//! Keys left out keep their defaults. Unknown sections and keys are
//! errors, so a typo cannot silently fall back to a default.

use core::fmt;

use escapement_core::config::{
    ClockConfig, CoilConfig, DriveStrength, LinkConfig, MovementConfig,
};
use escapement_core::{ConfigError, TickMode};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection { line: u16 },
    /// Key not valid in its section
    UnknownKey { line: u16 },
    /// Line is not `key = value`
    InvalidLine { line: u16 },
    /// Value has the wrong type or is out of range
    InvalidValue { line: u16 },
    /// Parsed, but the values do not make a working clock
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Invalid(e)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidSection { line } => write!(f, "line {}: invalid section", line),
            ParseError::UnknownKey { line } => write!(f, "line {}: unknown key", line),
            ParseError::InvalidLine { line } => write!(f, "line {}: expected key = value", line),
            ParseError::InvalidValue { line } => write!(f, "line {}: invalid value", line),
            ParseError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Movement,
    Coil,
    Link,
}

/// Why a single value was refused; the caller adds the line number
enum ValueError {
    UnknownKey,
    Invalid,
}

/// Parse `clock.toml` into a validated configuration
pub fn parse_config(input: &str) -> Result<ClockConfig, ParseError> {
    let mut config = ClockConfig::default();
    let mut section = Section::Root;

    for (number, raw) in input.lines().enumerate() {
        let line = u16::try_from(number + 1).unwrap_or(u16::MAX);
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }

        if let Some(header) = text.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .ok_or(ParseError::InvalidSection { line })?;
            section = match name.trim() {
                "movement" => Section::Movement,
                "coil" => Section::Coil,
                "link" => Section::Link,
                _ => return Err(ParseError::InvalidSection { line }),
            };
            continue;
        }

        let (key, value) = parse_key_value(text).ok_or(ParseError::InvalidLine { line })?;
        let applied = match section {
            Section::Root => Err(ValueError::UnknownKey),
            Section::Movement => apply_movement(&mut config.movement, key, value),
            Section::Coil => apply_coil(&mut config.coil, key, value),
            Section::Link => apply_link(&mut config.link, key, value),
        };
        applied.map_err(|e| match e {
            ValueError::UnknownKey => ParseError::UnknownKey { line },
            ValueError::Invalid => ParseError::InvalidValue { line },
        })?;
    }

    config.validate()?;
    Ok(config)
}

fn apply_movement(movement: &mut MovementConfig, key: &str, value: &str) -> Result<(), ValueError> {
    let field = match key {
        "default_mode" => {
            let name = parse_string(value);
            movement.default_mode = TickMode::from_name(name).ok_or(ValueError::Invalid)?;
            return Ok(());
        }
        "pulse_ms" => &mut movement.pulse_ms,
        "safety_margin_ms" => &mut movement.safety_margin_ms,
        "boundary_window_ms" => &mut movement.boundary_window_ms,
        "start_window_ms" => &mut movement.start_window_ms,
        "boundary_lead_ms" => &mut movement.boundary_lead_ms,
        "time_sync_timeout_ms" => &mut movement.time_sync_timeout_ms,
        "steady_tick_ms" => &mut movement.steady_tick_ms,
        "rush_tick_ms" => &mut movement.rush_tick_ms,
        "sprint_tick_ms" => &mut movement.sprint_tick_ms,
        "crawl_tick_ms" => &mut movement.crawl_tick_ms,
        "calibrate_tick_ms" => &mut movement.calibrate_tick_ms,
        _ => return Err(ValueError::UnknownKey),
    };
    *field = parse_int(value)?;
    Ok(())
}

fn apply_coil(coil: &mut CoilConfig, key: &str, value: &str) -> Result<(), ValueError> {
    match key {
        "pin_a" => coil.pin_a = parse_pin(value)?,
        "pin_b" => coil.pin_b = parse_pin(value)?,
        "drive_ma" => {
            coil.drive = DriveStrength::from_ma(parse_int(value)?).ok_or(ValueError::Invalid)?
        }
        _ => return Err(ValueError::UnknownKey),
    }
    Ok(())
}

fn apply_link(link: &mut LinkConfig, key: &str, value: &str) -> Result<(), ValueError> {
    match key {
        "max_missed_heartbeats" => link.max_missed_heartbeats = parse_int(value)?,
        "heartbeat_timeout_ms" => link.heartbeat_timeout_ms = parse_int(value)?,
        "reconnect_backoff_ms" => link.reconnect_backoff_ms = parse_int(value)?,
        "resync_interval_ms" => link.resync_interval_ms = parse_int(value)?,
        "stale_after_ms" => link.stale_after_ms = parse_int(value)?,
        "min_idle_slack_ms" => link.min_idle_slack_ms = parse_int(value)?,
        _ => return Err(ValueError::UnknownKey),
    }
    Ok(())
}

/// Drop a trailing comment unless the `#` is inside a string
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split "key = value"
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse an integer value, allowing `_` separators
fn parse_int<T: TryFrom<u64>>(value: &str) -> Result<T, ValueError> {
    let mut n: u64 = 0;
    let mut digits = 0;
    for c in value.chars() {
        if c == '_' {
            continue;
        }
        let d = c.to_digit(10).ok_or(ValueError::Invalid)?;
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_add(u64::from(d)))
            .ok_or(ValueError::Invalid)?;
        digits += 1;
    }
    if digits == 0 {
        return Err(ValueError::Invalid);
    }
    T::try_from(n).map_err(|_| ValueError::Invalid)
}

/// Parse a pin given as `"gpio7"` or a bare number
fn parse_pin(value: &str) -> Result<u8, ValueError> {
    let value = parse_string(value);
    let number = value.strip_prefix("gpio").unwrap_or(value);
    parse_int(number)
}
