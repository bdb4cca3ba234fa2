//! Coil driver trait

/// Trait for the movement's stepper coil
///
/// A Lavet-type movement advances one step per pulse and only moves when
/// successive pulses alternate polarity. Implementations drive one end of
/// the coil high and the other low.
pub trait CoilDriver {
    /// Energize the coil and hold it for `duration_ms`
    ///
    /// `pin_a_high` selects the polarity: pin A high and pin B low, or
    /// the reverse. Returns once the hold time has elapsed; the coil stays
    /// energized until [`idle`](Self::idle) is called.
    fn energize(&mut self, pin_a_high: bool, duration_ms: u32);

    /// Release both coil pins to their idle level
    fn idle(&mut self);
}
