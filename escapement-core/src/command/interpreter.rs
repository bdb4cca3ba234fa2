//! Command interpreter
//!
//! Applies parsed commands to the runtime state. Nothing here fires a
//! pulse; the synchronizer acts on the new state at its next step.

use crate::config::MovementConfig;
use crate::mode::TickMode;
use crate::sync::events::{ClockEvent, EventLog, StopReason};
use crate::sync::RuntimeState;

use super::parse::Command;

/// Whether the synchronizer must drop its current timing plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timing {
    Keep,
    Restart,
}

/// Turns commands into state transitions
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    config: MovementConfig,
}

impl CommandInterpreter {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    /// Apply one command, queueing the events it causes
    pub fn apply(
        &self,
        state: &mut RuntimeState,
        command: Command,
        events: &mut EventLog,
    ) -> Timing {
        match command {
            Command::Stop => {
                state.stop();
                events.push(ClockEvent::Stopped(StopReason::Command));
                Timing::Restart
            }
            Command::Start => {
                state.start_now();
                events.push(ClockEvent::Started {
                    mode: state.current_mode(),
                    synchronized: false,
                });
                Timing::Restart
            }
            Command::StartAtMinute => {
                state.arm_start_at_minute();
                Timing::Restart
            }
            Command::StopAtTop => {
                state.arm_stop_at_top();
                Timing::Keep
            }
            Command::Mode { mode, tick_ms } => self.select_mode(state, mode, tick_ms, events),
            Command::Calibrate { position, tick_ms } => {
                let tick_ms = self
                    .config
                    .clamp_positioning_tick(tick_ms.unwrap_or(self.config.calibrate_tick_ms));
                if let Some(change) = state.begin_calibration(position, tick_ms) {
                    events.push(ClockEvent::ModeChanged(change));
                }
                events.push(ClockEvent::CalibrationStarted { position, tick_ms });
                Timing::Keep
            }
        }
    }

    fn select_mode(
        &self,
        state: &mut RuntimeState,
        mode: TickMode,
        tick_ms: Option<u32>,
        events: &mut EventLog,
    ) -> Timing {
        if mode.is_positioning() {
            let tick_ms = tick_ms
                .or_else(|| mode.default_positioning_tick_ms(&self.config))
                .unwrap_or(self.config.sprint_tick_ms);
            let tick_ms = self.config.clamp_positioning_tick(tick_ms);
            if let Some(change) = state.enter_positioning(mode, tick_ms) {
                events.push(ClockEvent::ModeChanged(change));
            }
            return Timing::Keep;
        }

        // Stopped or waiting: nothing is mid-revolution, apply now and resync
        if state.is_stopped() {
            if let Some(change) = state.apply_timekeeping_now(mode) {
                events.push(ClockEvent::ModeChanged(change));
            }
            return Timing::Restart;
        }

        if state.queue_timekeeping(mode) {
            events.push(ClockEvent::ModeQueued(mode));
        }
        Timing::Keep
    }
}
