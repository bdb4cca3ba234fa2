//! Time traits
//!
//! Wall-clock time comes from a [`TimeSource`] and is only consulted at
//! minute boundaries. Everything in between is scheduled against a
//! [`Monotonic`] millisecond counter, and the only way to wait is
//! [`Timer::wait_until`].

/// Wall-clock time, as far as the minute is concerned
pub trait TimeSource {
    /// Milliseconds elapsed in the current wall-clock minute (0..60000)
    fn now_ms_into_minute(&self) -> u32;

    /// Whether the time has been set from the network recently enough
    fn is_synced(&self) -> bool;
}

/// Free-running millisecond counter
///
/// Must never go backwards.
pub trait Monotonic {
    fn now_ms(&self) -> u64;
}

/// Blocking wait primitive
pub trait Timer: Monotonic {
    /// Block until the monotonic clock reaches `deadline_ms`
    ///
    /// Returns immediately if the deadline has already passed.
    fn wait_until(&mut self, deadline_ms: u64);
}
