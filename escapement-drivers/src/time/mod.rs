//! Time sources

pub mod anchored;

pub use anchored::{ntp_to_unix_ms, AnchoredTime, TimeSyncError, MAX_ROUND_TRIP_MS};
