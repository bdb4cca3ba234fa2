//! Configuration loading and parsing
//!
//! The clock configuration is compiled into the firmware from
//! `clock.toml` and parsed at boot by a small no_std parser.

pub mod toml;

pub use toml::parse_config;
