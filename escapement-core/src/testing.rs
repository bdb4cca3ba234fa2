//! Simulated collaborators for unit tests
//!
//! All simulated parts share one `Cell<u64>` millisecond clock. Energizing
//! the coil and waiting on the timer move that clock forward, so a test can
//! run whole minutes of the synchronizer in microseconds.

use core::cell::Cell;

use heapless::Vec;

use crate::config::MINUTE_MS;
use crate::traits::{CoilDriver, Monotonic, TimeSource, Timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoilAction {
    Energize { pin_a_high: bool, duration_ms: u32 },
    Idle,
}

/// Coil that records what it was asked to do
pub(crate) struct RecordingCoil<'a> {
    clock: Option<&'a Cell<u64>>,
    actions: Vec<CoilAction, 64>,
    fire_times: Vec<u64, 1024>,
    polarities: Vec<bool, 1024>,
}

impl RecordingCoil<'static> {
    pub(crate) fn new() -> Self {
        Self {
            clock: None,
            actions: Vec::new(),
            fire_times: Vec::new(),
            polarities: Vec::new(),
        }
    }
}

impl<'a> RecordingCoil<'a> {
    pub(crate) fn with_clock(clock: &'a Cell<u64>) -> Self {
        Self {
            clock: Some(clock),
            actions: Vec::new(),
            fire_times: Vec::new(),
            polarities: Vec::new(),
        }
    }

    /// First actions, in order
    pub(crate) fn actions(&self) -> &[CoilAction] {
        &self.actions
    }

    pub(crate) fn pulses(&self) -> impl Iterator<Item = (bool, u32)> + '_ {
        self.actions.iter().filter_map(|action| match *action {
            CoilAction::Energize {
                pin_a_high,
                duration_ms,
            } => Some((pin_a_high, duration_ms)),
            CoilAction::Idle => None,
        })
    }

    /// Clock reading at the start of every pulse
    pub(crate) fn fire_times(&self) -> &[u64] {
        &self.fire_times
    }

    pub(crate) fn polarities(&self) -> &[bool] {
        &self.polarities
    }

    pub(crate) fn pulse_count(&self) -> usize {
        self.fire_times.len()
    }
}

impl CoilDriver for RecordingCoil<'_> {
    fn energize(&mut self, pin_a_high: bool, duration_ms: u32) {
        let _ = self.actions.push(CoilAction::Energize {
            pin_a_high,
            duration_ms,
        });
        let now = self.clock.map(Cell::get).unwrap_or(0);
        let _ = self.fire_times.push(now);
        let _ = self.polarities.push(pin_a_high);
        if let Some(clock) = self.clock {
            clock.set(now + u64::from(duration_ms));
        }
    }

    fn idle(&mut self) {
        let _ = self.actions.push(CoilAction::Idle);
    }
}

/// Timer that jumps the shared clock to each deadline
pub(crate) struct SimTimer<'a> {
    clock: &'a Cell<u64>,
    waits: u32,
}

impl<'a> SimTimer<'a> {
    pub(crate) fn new(clock: &'a Cell<u64>) -> Self {
        Self { clock, waits: 0 }
    }

    pub(crate) fn waits(&self) -> u32 {
        self.waits
    }
}

impl Monotonic for SimTimer<'_> {
    fn now_ms(&self) -> u64 {
        self.clock.get()
    }
}

impl Timer for SimTimer<'_> {
    fn wait_until(&mut self, deadline_ms: u64) {
        self.waits += 1;
        if deadline_ms > self.clock.get() {
            self.clock.set(deadline_ms);
        }
    }
}

/// Wall clock running at a fixed offset from the shared clock
pub(crate) struct SimTime<'a> {
    clock: &'a Cell<u64>,
    offset_ms: u64,
    synced: &'a Cell<bool>,
}

impl<'a> SimTime<'a> {
    /// `offset_ms` is the wall-clock reading when the shared clock is zero
    pub(crate) fn new(clock: &'a Cell<u64>, offset_ms: u64, synced: &'a Cell<bool>) -> Self {
        Self {
            clock,
            offset_ms,
            synced,
        }
    }
}

impl TimeSource for SimTime<'_> {
    fn now_ms_into_minute(&self) -> u32 {
        ((self.clock.get() + self.offset_ms) % u64::from(MINUTE_MS)) as u32
    }

    fn is_synced(&self) -> bool {
        self.synced.get()
    }
}

/// Advance the shared clock without going through the timer
pub(crate) fn advance(clock: &Cell<u64>, ms: u64) {
    clock.set(clock.get() + ms);
}
