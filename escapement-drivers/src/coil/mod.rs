//! Coil drivers

pub mod gpio;

pub use gpio::GpioCoil;
