//! GPIO coil drive
//!
//! A Lavet stepping motor coil wired across two GPIO outputs. Driving one
//! pin high and the other low pushes current through the coil in one
//! direction; both low leaves it unpowered.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use escapement_core::traits::CoilDriver;

/// Coil driven directly from two GPIO pins
///
/// The pulse is held with a blocking delay. Pins must be infallible, as
/// the RP2040 outputs are.
pub struct GpioCoil<A, B, D> {
    pin_a: A,
    pin_b: B,
    delay: D,
}

impl<A, B, D> GpioCoil<A, B, D>
where
    A: OutputPin<Error = Infallible>,
    B: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    /// Create a new coil driver with both outputs low
    pub fn new(pin_a: A, pin_b: B, delay: D) -> Self {
        let mut coil = Self {
            pin_a,
            pin_b,
            delay,
        };
        coil.idle();
        coil
    }

    /// Release the pins and delay
    pub fn release(self) -> (A, B, D) {
        (self.pin_a, self.pin_b, self.delay)
    }
}

impl<A, B, D> CoilDriver for GpioCoil<A, B, D>
where
    A: OutputPin<Error = Infallible>,
    B: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    fn energize(&mut self, pin_a_high: bool, duration_ms: u32) {
        // Drop the low side first so the pins are never both high
        if pin_a_high {
            infallible(self.pin_b.set_low());
            infallible(self.pin_a.set_high());
        } else {
            infallible(self.pin_a.set_low());
            infallible(self.pin_b.set_high());
        }
        self.delay.delay_ms(duration_ms);
    }

    fn idle(&mut self) {
        infallible(self.pin_a.set_low());
        infallible(self.pin_b.set_low());
    }
}

fn infallible(result: Result<(), Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}
