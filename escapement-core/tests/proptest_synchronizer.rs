use std::cell::{Cell, RefCell};

use escapement_core::traits::{CoilDriver, Monotonic, TimeSource, Timer};
use escapement_core::{ClockEvent, MovementConfig, Phase, Step, Synchronizer, TickMode};
use proptest::prelude::*;

/// Shared simulated clock
struct World {
    now: Cell<u64>,
    polarities: RefCell<Vec<bool>>,
}

struct Coil<'a>(&'a World);

impl CoilDriver for Coil<'_> {
    fn energize(&mut self, pin_a_high: bool, duration_ms: u32) {
        self.0.polarities.borrow_mut().push(pin_a_high);
        self.0.now.set(self.0.now.get() + u64::from(duration_ms));
    }

    fn idle(&mut self) {}
}

struct Wall<'a>(&'a World, u64);

impl TimeSource for Wall<'_> {
    fn now_ms_into_minute(&self) -> u32 {
        ((self.0.now.get() + self.1) % 60_000) as u32
    }

    fn is_synced(&self) -> bool {
        true
    }
}

struct Sleeper<'a>(&'a World);

impl Monotonic for Sleeper<'_> {
    fn now_ms(&self) -> u64 {
        self.0.now.get()
    }
}

impl Timer for Sleeper<'_> {
    fn wait_until(&mut self, deadline_ms: u64) {
        if deadline_ms > self.0.now.get() {
            self.0.now.set(deadline_ms);
        }
    }
}

const COMMANDS: &[&str] = &[
    "stop",
    "start",
    "start_at_minute",
    "stop_at_top",
    "steady",
    "rush_wait",
    "vetinari",
    "hesitate",
    "stumble",
    "sprint 80",
    "crawl 400",
    "calibrate 12",
    "calibrate 45",
];

/// A command and how long to run before it
fn script() -> impl Strategy<Value = Vec<(usize, u32)>> {
    prop::collection::vec((0..COMMANDS.len(), 0u32..90_000), 1..8)
}

/// Per-step invariants, checked across whole runs
struct Observer {
    timekeeping_queued: Option<TickMode>,
}

impl Observer {
    fn check_transition(
        &mut self,
        before: (TickMode, Phase),
        sync: &Synchronizer<Coil<'_>, Wall<'_>, Sleeper<'_>>,
        saw_revolution: bool,
    ) -> Result<(), TestCaseError> {
        let (mode_before, phase_before) = before;
        let state = sync.state();

        if mode_before.is_positioning() && state.current_mode().is_timekeeping() {
            prop_assert!(
                state.start_at_minute_pending() || phase_before == Phase::WaitingForMinuteBoundary,
                "positioning handed over without waiting for the minute"
            );
        }

        if self.timekeeping_queued.is_some() && !saw_revolution {
            prop_assert_eq!(state.current_mode(), mode_before);
        }
        if saw_revolution || state.is_stopped() {
            self.timekeeping_queued = None;
        }
        Ok(())
    }
}

fn run(script: &[(usize, u32)], offset_ms: u64) -> Result<(), TestCaseError> {
    let world = World {
        now: Cell::new(0),
        polarities: RefCell::new(Vec::new()),
    };
    let mut sync = Synchronizer::new(
        MovementConfig::default(),
        Coil(&world),
        Wall(&world, offset_ms),
        Sleeper(&world),
        7,
    );
    let mut observer = Observer {
        timekeeping_queued: None,
    };

    for &(command, run_ms) in script {
        let end = world.now.get() + u64::from(run_ms);
        let mut guard = 0;
        while world.now.get() < end {
            guard += 1;
            prop_assert!(guard < 50_000);

            let before = (sync.state().current_mode(), sync.state().phase());
            let index_before = sync.state().pulse_index();
            let fired_before = sync.pulses_fired();
            let step = sync.step();

            let mut saw_revolution = false;
            while let Some(event) = sync.next_event() {
                saw_revolution |= matches!(event, ClockEvent::RevolutionComplete { .. });
            }
            observer.check_transition(before, &sync, saw_revolution)?;

            match step {
                Step::Pulsed => {
                    prop_assert_eq!(sync.pulses_fired(), fired_before + 1);
                    let index = sync.state().pulse_index();
                    prop_assert!(
                        index == index_before + 1 || index == 0 || index == 1,
                        "index jumped from {} to {}",
                        index_before,
                        index
                    );
                }
                Step::Idle { slack_ms } => {
                    prop_assert_eq!(sync.pulses_fired(), fired_before);
                    let remaining = end - world.now.get();
                    world.now.set(world.now.get() + u64::from(slack_ms).min(remaining));
                }
                Step::Stopped => {
                    let remaining = end - world.now.get();
                    world.now.set(world.now.get() + 250.min(remaining));
                }
            }
        }

        let text = COMMANDS[command];
        let before = sync.state().current_mode();
        let was_running_timekeeping = sync.state().phase() == Phase::RunningTimekeeping;
        prop_assert!(sync.handle_text(text).is_ok());

        if let Some(mode) = TickMode::from_name(text) {
            if mode.is_timekeeping() && was_running_timekeeping && mode != before {
                prop_assert_eq!(sync.state().current_mode(), before);
                observer.timekeeping_queued = Some(mode);
            }
        }
        // A stop or a positioning mode ends the revolution the change was
        // queued for
        if sync.state().is_stopped() || sync.state().current_mode().is_positioning() {
            observer.timekeeping_queued = None;
        }
    }

    // The coil polarity alternates on every pulse, whatever was commanded
    let polarities = world.polarities.borrow();
    prop_assert!(polarities.windows(2).all(|w| w[0] != w[1]));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Random command scripts keep the pulse and mode invariants.
    #[test]
    fn command_scripts_keep_invariants(script in script(), offset_ms in 0u64..60_000) {
        run(&script, offset_ms)?;
    }
}
