//! Pulse engine
//!
//! Energize, hold, release, count. The engine knows nothing about modes,
//! minutes or revolutions.

use crate::config::PULSES_PER_REVOLUTION;
use crate::traits::CoilDriver;

/// Where the hand is within the current revolution
///
/// `index` counts pulses since the last wrap. It is advanced only by
/// [`PulseEngine::fire`]; the synchronizer may wrap it, park it at the
/// reference position, or seed it for calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandPosition {
    index: u16,
    polarity: bool,
}

impl Default for HandPosition {
    fn default() -> Self {
        Self::at_reference()
    }
}

impl HandPosition {
    /// Index of the reference position, one step before the wrap
    pub const REFERENCE: u16 = PULSES_PER_REVOLUTION - 1;

    /// The power-on assumption: hand parked at the reference position
    pub const fn at_reference() -> Self {
        Self {
            index: Self::REFERENCE,
            polarity: false,
        }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    /// Polarity of the next pulse (`true` = pin A high)
    pub fn polarity(&self) -> bool {
        self.polarity
    }

    pub fn is_at_reference(&self) -> bool {
        self.index == Self::REFERENCE
    }

    /// Whether the hand has gone a full revolution since the last wrap
    pub fn revolution_done(&self) -> bool {
        self.index >= PULSES_PER_REVOLUTION
    }

    fn advance(&mut self) {
        self.polarity = !self.polarity;
        self.index = self.index.saturating_add(1);
    }

    pub(crate) fn wrap(&mut self) {
        self.index = 0;
    }

    pub(crate) fn park_at_reference(&mut self) {
        self.index = Self::REFERENCE;
    }

    pub(crate) fn seed(&mut self, index: u16) {
        self.index = index;
    }
}

/// Fires coil pulses and counts them
pub struct PulseEngine<C> {
    coil: C,
    fired: u32,
}

impl<C: CoilDriver> PulseEngine<C> {
    /// Create a new engine, releasing the coil first
    pub fn new(mut coil: C) -> Self {
        coil.idle();
        Self { coil, fired: 0 }
    }

    /// Fire one pulse of `duration_ms` and advance the hand
    pub fn fire(&mut self, hand: &mut HandPosition, duration_ms: u32) {
        self.coil.energize(hand.polarity(), duration_ms);
        self.coil.idle();
        hand.advance();
        self.fired = self.fired.wrapping_add(1);
    }

    /// Pulses fired since power-on
    pub fn pulses_fired(&self) -> u32 {
        self.fired
    }

    pub fn coil(&self) -> &C {
        &self.coil
    }
}
