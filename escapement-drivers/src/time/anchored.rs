//! Wall-clock time anchored to NTP samples
//!
//! The bridge delivers NTP timestamps over the serial link. Each sample
//! pins a Unix time to a monotonic instant; between samples the wall clock
//! is extrapolated from the monotonic clock.

use core::fmt;

use escapement_core::config::MINUTE_MS;
use escapement_core::traits::{Monotonic, TimeSource};

/// Seconds from 1900-01-01 (NTP epoch) to 1970-01-01 (Unix epoch)
pub const EPOCH_DELTA: u64 = 2_208_988_800;

/// Seconds in one NTP era
pub const ERA_SECONDS: u64 = 1 << 32;

/// Samples whose round trip took longer are too uncertain to use
pub const MAX_ROUND_TRIP_MS: u32 = 2000;

/// Why a time sample was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSyncError {
    /// All-zero timestamp, sent by servers that are not synchronized
    ZeroTimestamp,
    /// Round trip exceeded [`MAX_ROUND_TRIP_MS`]
    RoundTripTooLong(u32),
}

impl fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSyncError::ZeroTimestamp => f.write_str("server sent a zero timestamp"),
            TimeSyncError::RoundTripTooLong(ms) => write!(f, "round trip of {} ms too long", ms),
        }
    }
}

/// Convert an NTP timestamp to Unix milliseconds
///
/// The device never runs before 1970, so a seconds value below the Unix
/// epoch can only mean the timestamp has rolled into era 1 (after 2036).
pub fn ntp_to_unix_ms(seconds: u32, fraction: u32) -> u64 {
    let raw = u64::from(seconds);
    let ntp_seconds = if raw >= EPOCH_DELTA {
        raw
    } else {
        raw + ERA_SECONDS
    };
    let millis = (u64::from(fraction) * 1000) >> 32;
    (ntp_seconds - EPOCH_DELTA) * 1000 + millis
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    unix_ms: u64,
    mono_ms: u64,
}

/// Time source that extrapolates the last NTP sample
///
/// Before the first sample, and once the last one is older than the stale
/// limit, [`is_synced`](TimeSource::is_synced) reports `false`. The minute
/// position is still answered from the last anchor, or from the monotonic
/// clock if there never was one, so the clock keeps running unsynchronized.
pub struct AnchoredTime<M> {
    clock: M,
    anchor: Option<Anchor>,
    stale_after_ms: u32,
}

impl<M: Monotonic> AnchoredTime<M> {
    pub fn new(clock: M, stale_after_ms: u32) -> Self {
        Self {
            clock,
            anchor: None,
            stale_after_ms,
        }
    }

    /// Anchor the wall clock to `unix_ms` as of now
    pub fn sync_unix_ms(&mut self, unix_ms: u64) {
        self.anchor = Some(Anchor {
            unix_ms,
            mono_ms: self.clock.now_ms(),
        });
    }

    /// Anchor the wall clock to an NTP transmit timestamp
    ///
    /// Half the round trip is added to account for the reply's travel
    /// time. Returns the Unix time that was applied.
    pub fn sync_ntp(
        &mut self,
        seconds: u32,
        fraction: u32,
        round_trip_ms: u32,
    ) -> Result<u64, TimeSyncError> {
        if seconds == 0 && fraction == 0 {
            return Err(TimeSyncError::ZeroTimestamp);
        }
        if round_trip_ms > MAX_ROUND_TRIP_MS {
            return Err(TimeSyncError::RoundTripTooLong(round_trip_ms));
        }

        let unix_ms = ntp_to_unix_ms(seconds, fraction) + u64::from(round_trip_ms / 2);
        self.sync_unix_ms(unix_ms);
        Ok(unix_ms)
    }

    /// Current Unix time, if a sample was ever received
    pub fn unix_ms(&self) -> Option<u64> {
        let anchor = self.anchor?;
        let elapsed = self.clock.now_ms().saturating_sub(anchor.mono_ms);
        Some(anchor.unix_ms + elapsed)
    }

    /// Time since the last sample
    pub fn sample_age_ms(&self) -> Option<u64> {
        let anchor = self.anchor?;
        Some(self.clock.now_ms().saturating_sub(anchor.mono_ms))
    }

    pub fn is_stale(&self) -> bool {
        self.sample_age_ms()
            .map_or(true, |age| age >= u64::from(self.stale_after_ms))
    }

    pub fn monotonic(&self) -> &M {
        &self.clock
    }
}

impl<M: Monotonic> TimeSource for AnchoredTime<M> {
    fn now_ms_into_minute(&self) -> u32 {
        let now = self.unix_ms().unwrap_or_else(|| self.clock.now_ms());
        (now % u64::from(MINUTE_MS)) as u32
    }

    fn is_synced(&self) -> bool {
        !self.is_stale()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    struct MockClock<'a>(&'a Cell<u64>);

    impl Monotonic for MockClock<'_> {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    /// 2024-01-01T00:00:00Z
    const NTP_2024: u32 = 3_913_056_000;
    const UNIX_2024_MS: u64 = 1_704_067_200_000;

    #[test]
    fn test_ntp_conversion() {
        assert_eq!(ntp_to_unix_ms(NTP_2024, 0), UNIX_2024_MS);
        // Half a second
        assert_eq!(ntp_to_unix_ms(NTP_2024, 1 << 31), UNIX_2024_MS + 500);
        assert_eq!(ntp_to_unix_ms(EPOCH_DELTA as u32, 0), 0);
    }

    #[test]
    fn test_ntp_era_rollover() {
        // 100 s into era 1
        let expected = (ERA_SECONDS + 100 - EPOCH_DELTA) * 1000;
        assert_eq!(ntp_to_unix_ms(100, 0), expected);
    }

    #[test]
    fn test_unsynced_falls_back_to_monotonic() {
        let now = Cell::new(125_000);
        let time = AnchoredTime::new(MockClock(&now), 60_000);
        assert!(!time.is_synced());
        assert_eq!(time.unix_ms(), None);
        assert_eq!(time.now_ms_into_minute(), 5_000);
    }

    #[test]
    fn test_sync_extrapolates() {
        let now = Cell::new(1_000);
        let mut time = AnchoredTime::new(MockClock(&now), 60_000);

        let applied = time.sync_ntp(NTP_2024, 0, 40).unwrap();
        assert_eq!(applied, UNIX_2024_MS + 20);
        assert!(time.is_synced());

        now.set(31_000);
        assert_eq!(time.unix_ms(), Some(UNIX_2024_MS + 30_020));
        assert_eq!(time.now_ms_into_minute(), 30_020);
    }

    #[test]
    fn test_sample_goes_stale() {
        let now = Cell::new(0);
        let mut time = AnchoredTime::new(MockClock(&now), 60_000);
        time.sync_unix_ms(UNIX_2024_MS);

        now.set(59_999);
        assert!(time.is_synced());
        now.set(60_000);
        assert!(!time.is_synced());
        // Still extrapolating from the old anchor
        assert_eq!(time.now_ms_into_minute(), 0);
    }

    #[test]
    fn test_rejected_samples_keep_anchor() {
        let now = Cell::new(0);
        let mut time = AnchoredTime::new(MockClock(&now), 60_000);
        time.sync_unix_ms(UNIX_2024_MS);

        assert_eq!(time.sync_ntp(0, 0, 10), Err(TimeSyncError::ZeroTimestamp));
        assert_eq!(
            time.sync_ntp(NTP_2024 + 7, 0, 2500),
            Err(TimeSyncError::RoundTripTooLong(2500))
        );
        assert_eq!(time.unix_ms(), Some(UNIX_2024_MS));
    }
}
