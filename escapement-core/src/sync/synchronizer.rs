//! Synchronizer
//!
//! Decides, one cooperative step at a time, when the next pulse fires.
//!
//! Timekeeping minutes are scheduled against absolute timestamps: when the
//! boundary pulse fires, the monotonic instant at which the wall-clock
//! minute began is recorded as the minute anchor, and pulse `i` of the
//! minute is due at `anchor + sum(schedule[0..=i])`. Loop jitter therefore
//! never accumulates. The time source is consulted again at every boundary,
//! which re-anchors the next minute.
//!
//! Waits longer than `boundary_lead_ms` are not slept through. [`step`]
//! returns [`Step::Idle`] instead so the caller can drain commands and do
//! link work, and calls back in before the deadline.
//!
//! [`step`]: Synchronizer::step

use crate::command::{
    parse_command, parse_command_bytes, Command, CommandError, CommandInterpreter, Timing,
};
use crate::config::{MovementConfig, MINUTE_MS};
use crate::error::ScheduleError;
use crate::pulse::{HandPosition, PulseEngine};
use crate::schedule::{PulseSchedule, ScheduleGenerator};
use crate::traits::{CoilDriver, TimeSource, Timer};

use super::events::{ClockEvent, EventLog, StopReason};
use super::state::{Phase, RevolutionOutcome, RuntimeState};

/// Result of one synchronizer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// A pulse was fired; call again right away
    Pulsed,
    /// Nothing is due for at least `slack_ms`
    Idle { slack_ms: u32 },
    /// Stopped with nothing pending
    Stopped,
}

impl Step {
    /// How long the caller may sleep before the next step, capped at `max_ms`
    pub fn poll_after_ms(&self, max_ms: u32) -> u32 {
        match self {
            Step::Pulsed => 0,
            Step::Idle { slack_ms } => (*slack_ms).min(max_ms),
            Step::Stopped => max_ms,
        }
    }

    /// Whether work that blocks for up to `min_slack_ms` fits before the
    /// next pulse
    pub fn allows_blocking_work(&self, min_slack_ms: u32) -> bool {
        match self {
            Step::Pulsed => false,
            Step::Idle { slack_ms } => *slack_ms >= min_slack_ms,
            Step::Stopped => true,
        }
    }
}

/// The current timekeeping minute
#[derive(Debug, Clone)]
struct MinutePlan {
    /// Monotonic time the minute started
    anchor_ms: u64,
    schedule: PulseSchedule,
}

/// Tick scheduling and synchronization state machine
///
/// Owns the runtime state, the pulse engine and both time collaborators.
/// Commands and steps are both run to completion, so the state is never
/// seen half-updated.
pub struct Synchronizer<C, T, W> {
    config: MovementConfig,
    state: RuntimeState,
    engine: PulseEngine<C>,
    time: T,
    timer: W,
    generator: ScheduleGenerator,
    interpreter: CommandInterpreter,
    plan: Option<MinutePlan>,
    /// Earliest start of the next positioning pulse
    next_free_pulse_ms: Option<u64>,
    /// When a synchronized start began waiting for time sync
    sync_wait_since: Option<u64>,
    sync_degraded: bool,
    events: EventLog,
}

impl<C: CoilDriver, T: TimeSource, W: Timer> Synchronizer<C, T, W> {
    /// Create a synchronizer in the power-on state
    ///
    /// `seed` drives every shuffled schedule from now on.
    pub fn new(config: MovementConfig, coil: C, time: T, timer: W, seed: u64) -> Self {
        Self {
            state: RuntimeState::boot(&config),
            engine: PulseEngine::new(coil),
            time,
            timer,
            generator: ScheduleGenerator::with_seed(seed),
            interpreter: CommandInterpreter::new(config.clone()),
            plan: None,
            next_free_pulse_ms: None,
            sync_wait_since: None,
            sync_degraded: false,
            events: EventLog::new(),
            config,
        }
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn time_source(&self) -> &T {
        &self.time
    }

    /// Mutable access for feeding time samples into the source
    pub fn time_source_mut(&mut self) -> &mut T {
        &mut self.time
    }

    pub fn timer(&self) -> &W {
        &self.timer
    }

    pub fn coil(&self) -> &C {
        self.engine.coil()
    }

    pub fn pulses_fired(&self) -> u32 {
        self.engine.pulses_fired()
    }

    /// Take the oldest unreported event
    pub fn next_event(&mut self) -> Option<ClockEvent> {
        self.events.pop()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Events lost to queue overflow since the previous call
    pub fn take_dropped_events(&mut self) -> u32 {
        self.events.take_dropped()
    }

    /// Apply a parsed command
    pub fn handle_command(&mut self, command: Command) {
        let timing = self
            .interpreter
            .apply(&mut self.state, command, &mut self.events);
        if timing == Timing::Restart {
            self.plan = None;
            self.next_free_pulse_ms = None;
        }
    }

    /// Parse and apply a text command
    ///
    /// Invalid commands change nothing and are reported as
    /// [`ClockEvent::CommandRejected`].
    pub fn handle_text(&mut self, text: &str) -> Result<(), CommandError> {
        self.handle_parsed(parse_command(text))
    }

    /// Parse and apply a command payload straight off the message bus
    pub fn handle_bytes(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        self.handle_parsed(parse_command_bytes(payload))
    }

    fn handle_parsed(&mut self, parsed: Result<Command, CommandError>) -> Result<(), CommandError> {
        match parsed {
            Ok(command) => {
                self.handle_command(command);
                Ok(())
            }
            Err(err) => {
                self.events.push(ClockEvent::CommandRejected(err));
                Err(err)
            }
        }
    }

    /// Run one step of the state machine
    pub fn step(&mut self) -> Step {
        match self.state.phase() {
            Phase::Stopped => Step::Stopped,
            Phase::WaitingForMinuteBoundary => self.step_start_at_minute(),
            Phase::RunningTimekeeping => self.step_timekeeping(),
            Phase::RunningPositioning | Phase::CalibrateSprinting => self.step_positioning(),
        }
    }

    fn step_start_at_minute(&mut self) -> Step {
        if let Some(step) = self.await_time_sync() {
            return step;
        }

        let ms = self.time.now_ms_into_minute();
        if ms >= self.config.start_window_ms {
            let until_boundary = MINUTE_MS.saturating_sub(ms);
            let deadline = self.timer.now_ms() + u64::from(until_boundary);
            if let Some(step) = self.wait_for(deadline) {
                return step;
            }
        }

        if let Some(change) = self.state.begin_minute() {
            self.events.push(ClockEvent::ModeChanged(change));
        }
        match self.plan_schedule() {
            Ok(schedule) => {
                self.fire_boundary(schedule);
                self.events.push(ClockEvent::Started {
                    mode: self.state.current_mode(),
                    synchronized: true,
                });
                Step::Pulsed
            }
            Err(err) => {
                self.reject_schedule(err);
                Step::Stopped
            }
        }
    }

    /// Bounded wait for the time source before a synchronized start
    fn await_time_sync(&mut self) -> Option<Step> {
        if self.time.is_synced() {
            self.sync_wait_since = None;
            self.sync_degraded = false;
            return None;
        }
        if self.sync_degraded {
            return None;
        }

        let now = self.timer.now_ms();
        let since = match self.sync_wait_since {
            Some(since) => since,
            None => {
                self.sync_wait_since = Some(now);
                self.events.push(ClockEvent::AwaitingTimeSync);
                now
            }
        };

        let timeout = u64::from(self.config.time_sync_timeout_ms);
        let waited = now.saturating_sub(since);
        if waited < timeout {
            return Some(Step::Idle {
                slack_ms: clamp_ms(timeout - waited),
            });
        }

        self.sync_degraded = true;
        self.events.push(ClockEvent::TimeSyncDegraded);
        None
    }

    fn step_timekeeping(&mut self) -> Step {
        let index = self.state.pulse_index();
        if index >= HandPosition::REFERENCE {
            return self.step_boundary();
        }

        if self.plan.is_none() {
            // Unsynchronized start: time the rest of the minute from now
            match self.plan_schedule() {
                Ok(schedule) => {
                    let elapsed: u32 = schedule.intervals()[..usize::from(index)].iter().sum();
                    let anchor_ms = self.timer.now_ms().saturating_sub(u64::from(elapsed));
                    self.plan = Some(MinutePlan {
                        anchor_ms,
                        schedule,
                    });
                }
                Err(err) => {
                    self.reject_schedule(err);
                    return Step::Stopped;
                }
            }
        }

        let Some(due) = self.plan.as_ref().and_then(|plan| {
            let offset = plan.schedule.due_offset_ms(index)?;
            Some(plan.anchor_ms + u64::from(offset))
        }) else {
            return Step::Stopped;
        };

        if let Some(step) = self.wait_for(due) {
            return step;
        }
        self.engine
            .fire(self.state.hand_mut(), self.config.pulse_ms);
        Step::Pulsed
    }

    /// Hand at the reference position: fire on the minute boundary
    fn step_boundary(&mut self) -> Step {
        let ms = self.time.now_ms_into_minute();
        if ms >= self.config.boundary_window_ms {
            let until_boundary = MINUTE_MS.saturating_sub(ms);
            let deadline = self.timer.now_ms() + u64::from(until_boundary);
            if let Some(step) = self.wait_for(deadline) {
                return step;
            }
        }

        self.events.push(ClockEvent::Boundary {
            ms_into_minute: self.time.now_ms_into_minute(),
        });

        // Revolution Complete is settled before the final pulse so that a
        // stop, or a schedule that cannot run, leaves the hand parked at
        // the reference position.
        let outcome = self.state.complete_revolution();
        self.report_revolution(outcome);
        if self.state.is_stopped() {
            self.plan = None;
            return self.settled();
        }

        match self.plan_schedule() {
            Ok(schedule) => {
                self.fire_boundary(schedule);
                Step::Pulsed
            }
            Err(err) => {
                self.reject_schedule(err);
                Step::Stopped
            }
        }
    }

    fn step_positioning(&mut self) -> Step {
        if let Some(due) = self.next_free_pulse_ms {
            if let Some(step) = self.wait_for(due) {
                return step;
            }
            self.next_free_pulse_ms = None;
        }

        if self.state.should_park_early() {
            // Skip the wrap pulse; timekeeping or the stop resumes from here
            let outcome = self.state.complete_revolution();
            self.report_revolution(outcome);
            return self.settled();
        }

        if self.state.hand().revolution_done() {
            // A handover armed after the reference position was passed
            // waits for the next time round
            if !self.state.parks_at_reference() {
                let outcome = self.state.complete_revolution();
                self.report_revolution(outcome);
            }
            self.state.hand_mut().wrap();
            if self.state.is_stopped() {
                return self.settled();
            }
        }

        let fire_start = self.timer.now_ms();
        self.engine
            .fire(self.state.hand_mut(), self.config.pulse_ms);
        self.next_free_pulse_ms =
            Some(fire_start + u64::from(self.state.positioning_tick_ms()));
        Step::Pulsed
    }

    /// Sleep until `deadline_ms` if it is close, otherwise report idle time
    fn wait_for(&mut self, deadline_ms: u64) -> Option<Step> {
        let remaining = deadline_ms.saturating_sub(self.timer.now_ms());
        let lead = u64::from(self.config.boundary_lead_ms);
        if remaining > lead {
            return Some(Step::Idle {
                slack_ms: clamp_ms(remaining - lead),
            });
        }
        if remaining > 0 {
            self.timer.wait_until(deadline_ms);
        }
        None
    }

    /// Next schedule for the current mode
    fn plan_schedule(&mut self) -> Result<PulseSchedule, ScheduleError> {
        let mode = self.state.current_mode();
        let schedule = self.generator.generate(mode, &self.config)?;
        // Boundaries only run in timekeeping modes, so there is always a table
        Ok(schedule.unwrap_or_else(|| PulseSchedule::uniform(self.config.steady_tick_ms)))
    }

    /// Fire the boundary pulse and start a new minute
    fn fire_boundary(&mut self, schedule: PulseSchedule) {
        let ms = self.time.now_ms_into_minute();
        let now = self.timer.now_ms();
        let anchor_ms = self.minute_anchor(now, ms);

        self.engine
            .fire(self.state.hand_mut(), self.config.pulse_ms);
        self.state.hand_mut().wrap();
        self.plan = Some(MinutePlan {
            anchor_ms,
            schedule,
        });
        self.next_free_pulse_ms = None;
    }

    /// Monotonic time at which the current wall-clock minute started
    ///
    /// A reading in the second half of the minute means the wall clock has
    /// not quite rolled over yet, so the minute starts slightly ahead.
    fn minute_anchor(&self, now_ms: u64, ms_into_minute: u32) -> u64 {
        if ms_into_minute > MINUTE_MS / 2 {
            let ahead = MINUTE_MS.saturating_sub(ms_into_minute);
            now_ms + u64::from(ahead)
        } else {
            now_ms.saturating_sub(u64::from(ms_into_minute))
        }
    }

    fn reject_schedule(&mut self, err: ScheduleError) {
        self.state.stop();
        self.plan = None;
        self.events.push(ClockEvent::ScheduleRejected(err));
        self.events
            .push(ClockEvent::Stopped(StopReason::ScheduleRejected));
    }

    fn report_revolution(&mut self, outcome: RevolutionOutcome) {
        self.events.push(ClockEvent::RevolutionComplete {
            pulses_fired: self.engine.pulses_fired(),
        });
        if let Some(change) = outcome.mode_change {
            self.events.push(ClockEvent::ModeChanged(change));
        }
        if outcome.stopped_at_top {
            self.events
                .push(ClockEvent::Stopped(StopReason::TopOfRevolution));
        }
    }

    /// Step result after a transition that did not fire
    fn settled(&self) -> Step {
        match self.state.phase() {
            Phase::Stopped => Step::Stopped,
            _ => Step::Idle { slack_ms: 0 },
        }
    }
}

fn clamp_ms(ms: u64) -> u32 {
    u32::try_from(ms).unwrap_or(u32::MAX)
}
