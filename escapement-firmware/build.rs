//! Build script for escapement-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates clock.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use escapement_core::config::{
    ClockConfig, CoilConfig, DriveStrength, LinkConfig, MovementConfig,
};
use escapement_core::TickMode;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate clock.toml at compile time
///
/// The firmware parses the same file at boot with its own no-alloc
/// reader. Both readers accept the same keys and finish with
/// `ClockConfig::validate`, so a file that builds also boots with the
/// values it names.
fn validate_config() {
    println!("cargo:rerun-if-changed=clock.toml");

    let config_path = Path::new("clock.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: clock.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds clock.toml as its configuration.            ║\n\
            ║  Please create one in the escapement-firmware directory.         ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read clock.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in clock.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    let config = build_config(&config, &mut errors);
    if errors.is_empty() {
        if let Err(e) = config.validate() {
            errors.push(e.to_string());
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid clock configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=clock.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill a `ClockConfig` from the parsed file, starting from defaults
fn build_config(value: &toml::Value, errors: &mut Vec<String>) -> ClockConfig {
    let mut config = ClockConfig::default();

    let Some(root) = value.as_table() else {
        errors.push("clock.toml must be a table".to_string());
        return config;
    };

    for (name, section) in root {
        if !["movement", "coil", "link"].contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
            continue;
        }
        let Some(table) = section.as_table() else {
            errors.push(format!("[{}] must be a table", name));
            continue;
        };
        for (key, value) in table {
            let result = match name.as_str() {
                "movement" => apply_movement(&mut config.movement, key, value),
                "coil" => apply_coil(&mut config.coil, key, value),
                _ => apply_link(&mut config.link, key, value),
            };
            if let Err(e) = result {
                errors.push(format!("[{}] {}: {}", name, key, e));
            }
        }
    }

    config
}

fn int<T: TryFrom<i64>>(value: &toml::Value) -> Result<T, &'static str> {
    let n = value.as_integer().ok_or("must be an integer")?;
    T::try_from(n).map_err(|_| "out of range")
}

fn apply_movement(
    movement: &mut MovementConfig,
    key: &str,
    value: &toml::Value,
) -> Result<(), &'static str> {
    let field = match key {
        "default_mode" => {
            let name = value.as_str().ok_or("must be a quoted mode name")?;
            movement.default_mode = TickMode::from_name(name).ok_or("unknown mode")?;
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
        _ => return Err("unknown key"),
    };
    *field = int(value)?;
    Ok(())
}

/// Accepts `"gpioN"` or a pin number, quoted or bare
fn pin(value: &toml::Value) -> Result<u8, &'static str> {
    match value {
        toml::Value::String(s) => s
            .strip_prefix("gpio")
            .unwrap_or(s)
            .parse()
            .map_err(|_| "must be gpioN or a pin number"),
        other => int(other),
    }
}

fn apply_coil(coil: &mut CoilConfig, key: &str, value: &toml::Value) -> Result<(), &'static str> {
    match key {
        "pin_a" => coil.pin_a = pin(value)?,
        "pin_b" => coil.pin_b = pin(value)?,
        "drive_ma" => {
            coil.drive = DriveStrength::from_ma(int(value)?).ok_or("must be 2, 4, 8 or 12")?
        }
        _ => return Err("unknown key"),
    }
    Ok(())
}

fn apply_link(link: &mut LinkConfig, key: &str, value: &toml::Value) -> Result<(), &'static str> {
    match key {
        "max_missed_heartbeats" => link.max_missed_heartbeats = int(value)?,
        "heartbeat_timeout_ms" => link.heartbeat_timeout_ms = int(value)?,
        "reconnect_backoff_ms" => link.reconnect_backoff_ms = int(value)?,
        "resync_interval_ms" => link.resync_interval_ms = int(value)?,
        "stale_after_ms" => link.stale_after_ms = int(value)?,
        "min_idle_slack_ms" => link.min_idle_slack_ms = int(value)?,
        _ => return Err("unknown key"),
    }
    Ok(())
}
