//! Runtime state
//!
//! The single mutable record of what the clock is doing. Fields are
//! private; every change goes through a named transition so the
//! invariants below can be checked in one place:
//!
//! - `last_timekeeping_mode` is always a timekeeping mode
//! - `pending_mode` is `Some` exactly when `mode_change_pending`
//! - `start_at_minute_pending` implies `stopped`
//! - `is_calibrate_sprint` implies the current mode is positioning

use crate::config::MovementConfig;
use crate::mode::TickMode;
use crate::pulse::HandPosition;

use super::events::ModeChange;

/// Derived view of the state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Stopped,
    WaitingForMinuteBoundary,
    RunningTimekeeping,
    RunningPositioning,
    CalibrateSprinting,
}

/// What Revolution Complete did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RevolutionOutcome {
    /// Armed stop-at-top fired; any pending mode was discarded
    pub stopped_at_top: bool,
    /// Pending mode that was applied
    pub mode_change: Option<ModeChange>,
    /// Positioning handed over to timekeeping; start waits for the minute
    pub awaiting_minute: bool,
}

/// Clock runtime state
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeState {
    current_mode: TickMode,
    pending_mode: Option<TickMode>,
    mode_change_pending: bool,
    stopped: bool,
    start_at_minute_pending: bool,
    stop_at_top_pending: bool,
    is_calibrate_sprint: bool,
    last_timekeeping_mode: TickMode,
    positioning_tick_ms: u32,
    hand: HandPosition,
}

impl RuntimeState {
    /// Power-on state: stopped at the reference position, waiting for the
    /// next minute in the configured default mode
    pub fn boot(config: &MovementConfig) -> Self {
        let mode = if config.default_mode.is_timekeeping() {
            config.default_mode
        } else {
            TickMode::Vetinari
        };
        Self {
            current_mode: mode,
            pending_mode: None,
            mode_change_pending: false,
            stopped: true,
            start_at_minute_pending: true,
            stop_at_top_pending: false,
            is_calibrate_sprint: false,
            last_timekeeping_mode: mode,
            positioning_tick_ms: config.sprint_tick_ms,
            hand: HandPosition::at_reference(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.start_at_minute_pending {
            Phase::WaitingForMinuteBoundary
        } else if self.stopped {
            Phase::Stopped
        } else if self.current_mode.is_timekeeping() {
            Phase::RunningTimekeeping
        } else if self.is_calibrate_sprint {
            Phase::CalibrateSprinting
        } else {
            Phase::RunningPositioning
        }
    }

    pub fn current_mode(&self) -> TickMode {
        self.current_mode
    }

    pub fn pending_mode(&self) -> Option<TickMode> {
        self.pending_mode
    }

    pub fn mode_change_pending(&self) -> bool {
        self.mode_change_pending
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn start_at_minute_pending(&self) -> bool {
        self.start_at_minute_pending
    }

    pub fn stop_at_top_pending(&self) -> bool {
        self.stop_at_top_pending
    }

    pub fn is_calibrate_sprint(&self) -> bool {
        self.is_calibrate_sprint
    }

    pub fn last_timekeeping_mode(&self) -> TickMode {
        self.last_timekeeping_mode
    }

    pub fn positioning_tick_ms(&self) -> u32 {
        self.positioning_tick_ms
    }

    pub fn hand(&self) -> &HandPosition {
        &self.hand
    }

    pub fn pulse_index(&self) -> u16 {
        self.hand.index()
    }

    pub(crate) fn hand_mut(&mut self) -> &mut HandPosition {
        &mut self.hand
    }

    /// A free-running (non-calibration) positioning run has to end at the
    /// reference position: a timekeeping mode or a stop is waiting for it
    pub(crate) fn parks_at_reference(&self) -> bool {
        if self.is_calibrate_sprint {
            return false;
        }
        let timekeeping_pending =
            self.mode_change_pending && self.pending_mode.is_some_and(TickMode::is_timekeeping);
        timekeeping_pending || self.stop_at_top_pending
    }

    pub(crate) fn should_park_early(&self) -> bool {
        self.hand.is_at_reference() && self.parks_at_reference()
    }

    fn set_mode(&mut self, mode: TickMode) -> Option<ModeChange> {
        let from = self.current_mode;
        self.current_mode = mode;
        if mode.is_timekeeping() {
            self.last_timekeeping_mode = mode;
        }
        (from != mode).then_some(ModeChange { from, to: mode })
    }

    fn clear_pending_mode(&mut self) {
        self.pending_mode = None;
        self.mode_change_pending = false;
    }

    pub(crate) fn stop(&mut self) {
        self.stopped = true;
        self.start_at_minute_pending = false;
        self.stop_at_top_pending = false;
        self.is_calibrate_sprint = false;
    }

    /// Unsynchronized start from position zero
    pub(crate) fn start_now(&mut self) {
        self.stopped = false;
        self.start_at_minute_pending = false;
        self.stop_at_top_pending = false;
        self.is_calibrate_sprint = false;
        self.hand.wrap();
    }

    pub(crate) fn arm_start_at_minute(&mut self) {
        self.stopped = true;
        self.start_at_minute_pending = true;
    }

    pub(crate) fn arm_stop_at_top(&mut self) {
        self.stop_at_top_pending = true;
    }

    /// Switch to a positioning mode immediately
    pub(crate) fn enter_positioning(&mut self, mode: TickMode, tick_ms: u32) -> Option<ModeChange> {
        debug_assert!(mode.is_positioning());
        self.clear_pending_mode();
        self.stopped = false;
        self.start_at_minute_pending = false;
        self.is_calibrate_sprint = false;
        self.positioning_tick_ms = tick_ms;
        self.set_mode(mode)
    }

    /// Apply a timekeeping mode now and re-synchronize at the next minute
    pub(crate) fn apply_timekeeping_now(&mut self, mode: TickMode) -> Option<ModeChange> {
        debug_assert!(mode.is_timekeeping());
        self.clear_pending_mode();
        self.is_calibrate_sprint = false;
        self.arm_start_at_minute();
        self.set_mode(mode)
    }

    /// Queue a timekeeping mode for the next Revolution Complete
    ///
    /// Requesting the mode already running cancels the queued change.
    /// Returns whether a change is now queued.
    pub(crate) fn queue_timekeeping(&mut self, mode: TickMode) -> bool {
        debug_assert!(mode.is_timekeeping());
        if mode == self.current_mode {
            self.clear_pending_mode();
            false
        } else {
            self.pending_mode = Some(mode);
            self.mode_change_pending = true;
            true
        }
    }

    /// Start a calibration sprint from `position`
    ///
    /// The hand index is seeded one ahead so the sprint's ordinary wrap
    /// lands the hand on the reference position.
    pub(crate) fn begin_calibration(&mut self, position: u16, tick_ms: u32) -> Option<ModeChange> {
        let change = self.enter_positioning(TickMode::Sprint, tick_ms);
        self.is_calibrate_sprint = true;
        self.stop_at_top_pending = false;
        self.pending_mode = Some(self.last_timekeeping_mode);
        self.mode_change_pending = true;
        self.hand.seed(position.saturating_add(1));
        change
    }

    /// Revolution Complete
    pub(crate) fn complete_revolution(&mut self) -> RevolutionOutcome {
        let mut outcome = RevolutionOutcome::default();
        self.is_calibrate_sprint = false;

        if self.stop_at_top_pending {
            self.stop_at_top_pending = false;
            self.stopped = true;
            self.clear_pending_mode();
            outcome.stopped_at_top = true;
            return outcome;
        }

        if self.mode_change_pending {
            let from = self.current_mode;
            if let Some(mode) = self.pending_mode {
                outcome.mode_change = self.set_mode(mode);
            }
            self.clear_pending_mode();

            if from.is_positioning() && self.current_mode.is_timekeeping() {
                self.arm_start_at_minute();
                outcome.awaiting_minute = true;
            }
        }
        outcome
    }

    /// Minute rollover with a start-at-minute pending
    ///
    /// Applies any queued mode, falls back to the last timekeeping mode if
    /// a positioning mode is active, clears the start flags and parks the
    /// hand at the reference position ready for the boundary pulse.
    pub(crate) fn begin_minute(&mut self) -> Option<ModeChange> {
        let before = self.current_mode;
        if let Some(mode) = self.pending_mode.filter(|_| self.mode_change_pending) {
            self.set_mode(mode);
        }
        self.clear_pending_mode();
        if self.current_mode.is_positioning() {
            let fallback = self.last_timekeeping_mode;
            self.set_mode(fallback);
        }
        self.stopped = false;
        self.start_at_minute_pending = false;
        self.is_calibrate_sprint = false;
        self.hand.park_at_reference();
        (before != self.current_mode).then_some(ModeChange {
            from: before,
            to: self.current_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(mode: TickMode) -> RuntimeState {
        let mut state = RuntimeState::boot(&MovementConfig::default());
        state.set_mode(mode);
        state.start_now();
        state
    }

    #[test]
    fn test_boot_state() {
        let state = RuntimeState::boot(&MovementConfig::default());
        assert_eq!(state.current_mode(), TickMode::Vetinari);
        assert!(state.is_stopped());
        assert!(state.start_at_minute_pending());
        assert!(state.hand().is_at_reference());
        assert_eq!(state.phase(), Phase::WaitingForMinuteBoundary);
    }

    #[test]
    fn test_phases() {
        let mut state = running(TickMode::Steady);
        assert_eq!(state.phase(), Phase::RunningTimekeeping);

        state.enter_positioning(TickMode::Crawl, 1500);
        assert_eq!(state.phase(), Phase::RunningPositioning);

        state.begin_calibration(10, 100);
        assert_eq!(state.phase(), Phase::CalibrateSprinting);

        state.stop();
        assert_eq!(state.phase(), Phase::Stopped);
    }

    #[test]
    fn test_queued_mode_waits_for_revolution() {
        let mut state = running(TickMode::Steady);
        assert!(state.queue_timekeeping(TickMode::Vetinari));
        assert_eq!(state.current_mode(), TickMode::Steady);

        let outcome = state.complete_revolution();
        assert_eq!(
            outcome.mode_change,
            Some(ModeChange {
                from: TickMode::Steady,
                to: TickMode::Vetinari
            })
        );
        assert!(!outcome.awaiting_minute);
        assert_eq!(state.current_mode(), TickMode::Vetinari);
        assert_eq!(state.last_timekeeping_mode(), TickMode::Vetinari);
        assert!(!state.mode_change_pending());
    }

    #[test]
    fn test_requesting_current_mode_cancels_queue() {
        let mut state = running(TickMode::Steady);
        state.queue_timekeeping(TickMode::Hesitate);
        assert!(!state.queue_timekeeping(TickMode::Steady));
        assert_eq!(state.pending_mode(), None);
        assert_eq!(state.complete_revolution().mode_change, None);
    }

    #[test]
    fn test_stop_at_top_discards_pending_mode() {
        let mut state = running(TickMode::Steady);
        state.queue_timekeeping(TickMode::Stumble);
        state.arm_stop_at_top();

        let outcome = state.complete_revolution();
        assert!(outcome.stopped_at_top);
        assert_eq!(outcome.mode_change, None);
        assert!(state.is_stopped());
        assert_eq!(state.current_mode(), TickMode::Steady);
        assert_eq!(state.pending_mode(), None);
        assert!(!state.stop_at_top_pending());
    }

    #[test]
    fn test_positioning_to_timekeeping_waits_for_minute() {
        let mut state = running(TickMode::Steady);
        state.enter_positioning(TickMode::Sprint, 100);
        state.queue_timekeeping(TickMode::Steady);

        let outcome = state.complete_revolution();
        assert!(outcome.awaiting_minute);
        assert!(state.is_stopped());
        assert!(state.start_at_minute_pending());
    }

    #[test]
    fn test_calibration_seeds_ahead() {
        let mut state = running(TickMode::Vetinari);
        state.begin_calibration(30, 100);

        assert_eq!(state.pulse_index(), 31);
        assert_eq!(state.current_mode(), TickMode::Sprint);
        assert!(state.is_calibrate_sprint());
        assert_eq!(state.pending_mode(), Some(TickMode::Vetinari));
        assert!(!state.should_park_early());
    }

    #[test]
    fn test_begin_minute_falls_back_to_timekeeping() {
        let mut state = running(TickMode::Hesitate);
        state.enter_positioning(TickMode::Crawl, 1500);
        state.arm_start_at_minute();

        let change = state.begin_minute();
        assert_eq!(
            change,
            Some(ModeChange {
                from: TickMode::Crawl,
                to: TickMode::Hesitate
            })
        );
        assert!(!state.is_stopped());
        assert!(state.hand().is_at_reference());
    }

    #[test]
    fn test_park_early_only_at_reference() {
        let mut state = running(TickMode::Steady);
        state.enter_positioning(TickMode::Sprint, 100);
        state.queue_timekeeping(TickMode::Steady);
        assert!(!state.should_park_early());

        state.hand_mut().park_at_reference();
        assert!(state.should_park_early());
    }
}
