//! Clock events
//!
//! The synchronizer and command interpreter do not log. They queue what
//! happened as [`ClockEvent`]s and the firmware drains and reports them.

use core::fmt;

use heapless::Deque;

use crate::command::CommandError;
use crate::error::ScheduleError;
use crate::mode::TickMode;

/// Queue depth; the oldest event is dropped when full
pub const EVENT_CAPACITY: usize = 16;

/// Why the clock stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    /// `stop` command
    Command,
    /// Armed `stop_at_top` reached the end of a revolution
    TopOfRevolution,
    /// The active mode's schedule did not fit the minute
    ScheduleRejected,
}

/// A mode transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeChange {
    pub from: TickMode,
    pub to: TickMode,
}

/// Something observable happened to the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockEvent {
    /// Minute boundary reached at the reference position
    Boundary { ms_into_minute: u32 },
    /// Clock started from a minute boundary or a `start` command
    Started { mode: TickMode, synchronized: bool },
    /// Active mode changed (published as retained status)
    ModeChanged(ModeChange),
    /// A timekeeping mode change was queued for the next revolution
    ModeQueued(TickMode),
    /// A revolution finished
    RevolutionComplete { pulses_fired: u32 },
    Stopped(StopReason),
    ScheduleRejected(ScheduleError),
    CalibrationStarted { position: u16, tick_ms: u32 },
    /// Synchronized start is waiting for the first time sample
    AwaitingTimeSync,
    /// Gave up waiting for time sync; starting on unsynced time
    TimeSyncDegraded,
    CommandRejected(CommandError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::Command => "command",
            StopReason::TopOfRevolution => "top of revolution",
            StopReason::ScheduleRejected => "schedule rejected",
        })
    }
}

impl fmt::Display for ClockEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockEvent::Boundary { ms_into_minute } => {
                write!(f, "boundary at +{} ms", ms_into_minute)
            }
            ClockEvent::Started { mode, synchronized } => {
                let how = if *synchronized { "at minute" } else { "now" };
                write!(f, "started {} ({})", how, mode)
            }
            ClockEvent::ModeChanged(change) => {
                write!(f, "mode {} -> {}", change.from, change.to)
            }
            ClockEvent::ModeQueued(mode) => write!(f, "mode {} queued for top", mode),
            ClockEvent::RevolutionComplete { pulses_fired } => {
                write!(f, "revolution complete, {} pulses total", pulses_fired)
            }
            ClockEvent::Stopped(reason) => write!(f, "stopped: {}", reason),
            ClockEvent::ScheduleRejected(err) => write!(f, "config error: {}", err),
            ClockEvent::CalibrationStarted { position, tick_ms } => {
                write!(f, "calibrating from {} at {} ms", position, tick_ms)
            }
            ClockEvent::AwaitingTimeSync => f.write_str("waiting for time sync"),
            ClockEvent::TimeSyncDegraded => {
                f.write_str("time sync timed out, starting on unsynced time")
            }
            ClockEvent::CommandRejected(err) => write!(f, "command rejected: {}", err),
        }
    }
}

/// Bounded event queue
#[derive(Debug, Default)]
pub struct EventLog {
    queue: Deque<ClockEvent, EVENT_CAPACITY>,
    dropped: u32,
    unreported: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event, dropping the oldest if full
    pub fn push(&mut self, event: ClockEvent) {
        if let Err(event) = self.queue.push_back(event) {
            self.queue.pop_front();
            self.dropped = self.dropped.saturating_add(1);
            self.unreported = self.unreported.saturating_add(1);
            let _ = self.queue.push_back(event);
        }
    }

    pub fn pop(&mut self) -> Option<ClockEvent> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events lost to overflow since power-on
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Events lost since the previous call
    pub fn take_dropped(&mut self) -> u32 {
        core::mem::take(&mut self.unreported)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClockEvent> {
        self.queue.iter()
    }
}
