//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in escapement-core:
//!
//! - H-bridge coil drive from two GPIO outputs
//! - Wall-clock time source anchored to NTP samples

#![no_std]
#![deny(unsafe_code)]

pub mod coil;
pub mod time;
