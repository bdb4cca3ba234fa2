//! Escapement - quartz clock driver firmware
//!
//! Drives a Lavet-type clock movement from an RP2040, keeping the second
//! hand locked to network time with a choice of ticking styles.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Drive, Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Delay;
use rand::RngCore;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use escapement_core::config::{ClockConfig, DriveStrength};
use escapement_core::Synchronizer;
use escapement_drivers::coil::GpioCoil;
use escapement_drivers::time::AnchoredTime;

use crate::config::parse_config;
use crate::link::BridgeLink;
use crate::time::EmbassyClock;

/// Embedded configuration (compiled into firmware)
/// Edit clock.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../clock.toml");

/// Coil pins as wired on the board
const COIL_PIN_A: u8 = 2;
const COIL_PIN_B: u8 = 3;

mod config;
mod link;
mod tasks;
mod time;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Escapement firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // Setup UART for the bridge link
    let uart_config = UartConfig::default(); // 115200 baud default

    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    let link = BridgeLink::new(tx, rx);

    info!("UART initialized for bridge link");

    // Pin assignment is board-specific (coil across GPIO2/GPIO3)
    if config.coil.pin_a != COIL_PIN_A || config.coil.pin_b != COIL_PIN_B {
        warn!(
            "clock.toml names coil pins gpio{}/gpio{}, board is wired to gpio{}/gpio{}",
            config.coil.pin_a, config.coil.pin_b, COIL_PIN_A, COIL_PIN_B
        );
    }
    let drive = drive_strength(config.coil.drive);
    let mut pin_a = Output::new(p.PIN_2, Level::Low);
    let mut pin_b = Output::new(p.PIN_3, Level::Low);
    pin_a.set_drive_strength(drive);
    pin_b.set_drive_strength(drive);
    let coil = GpioCoil::new(pin_a, pin_b, Delay);

    info!("Coil initialized at {} mA", config.coil.drive.ma());

    // Ring oscillator jitter seeds the tick shuffle
    let seed = RoscRng.next_u64();

    let time = AnchoredTime::new(EmbassyClock, config.link.stale_after_ms);
    let clock = Synchronizer::new(config.movement, coil, time, EmbassyClock, seed);

    spawner
        .spawn(tasks::clock_task(clock, link, config.link))
        .unwrap();

    info!("Clock task spawned, firmware running");
}

/// Parse the embedded clock.toml
///
/// build.rs already rejected a malformed file, so a failure here means
/// the two readers disagree. Fall back to built-in defaults rather than
/// leaving the clock dead.
fn load_config() -> ClockConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {}", e);
            error!("Using default configuration");
            ClockConfig::default()
        }
    }
}

fn drive_strength(drive: DriveStrength) -> Drive {
    match drive {
        DriveStrength::Ma2 => Drive::_2mA,
        DriveStrength::Ma4 => Drive::_4mA,
        DriveStrength::Ma8 => Drive::_8mA,
        DriveStrength::Ma12 => Drive::_12mA,
    }
}
