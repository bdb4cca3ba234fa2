use escapement_core::schedule::templates::VETINARI_TEMPLATE;
use escapement_core::schedule::ScheduleGenerator;
use escapement_core::{MovementConfig, ScheduleError, TickMode, MINUTE_MS, SCHEDULE_LEN};
use proptest::prelude::*;

fn timekeeping_modes() -> impl Strategy<Value = TickMode> {
    prop::sample::select(
        TickMode::ALL
            .into_iter()
            .filter(|mode| mode.is_timekeeping())
            .collect::<Vec<_>>(),
    )
}

proptest! {
    /// Every accepted minute leaves room for the boundary pulse.
    #[test]
    fn schedule_fits_minute(mode in timekeeping_modes(), seed in any::<u64>()) {
        let config = MovementConfig::default();
        let mut generator = ScheduleGenerator::with_seed(seed);
        let schedule = generator.generate(mode, &config).unwrap().unwrap();

        prop_assert!(schedule.total_ms() + config.pulse_ms <= MINUTE_MS);
        prop_assert!(schedule.intervals().iter().all(|&ms| ms >= config.pulse_ms));
    }

    /// Due offsets only ever move forward and end at the schedule total.
    #[test]
    fn due_offsets_increase(mode in timekeeping_modes(), seed in any::<u64>()) {
        let config = MovementConfig::default();
        let schedule = ScheduleGenerator::with_seed(seed)
            .generate(mode, &config)
            .unwrap()
            .unwrap();

        let mut last = 0;
        for index in 0..SCHEDULE_LEN as u16 {
            let due = schedule.due_offset_ms(index).unwrap();
            prop_assert!(due > last);
            last = due;
        }
        prop_assert_eq!(last, schedule.total_ms());
        prop_assert_eq!(schedule.due_offset_ms(SCHEDULE_LEN as u16), None);
    }

    /// A shuffled minute is a permutation of its template.
    #[test]
    fn vetinari_is_permutation(seed in any::<u64>()) {
        let schedule = ScheduleGenerator::with_seed(seed)
            .generate(TickMode::Vetinari, &MovementConfig::default())
            .unwrap()
            .unwrap();

        let mut sorted = *schedule.intervals();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, VETINARI_TEMPLATE);
    }

    /// Equal seeds give equal minutes.
    #[test]
    fn shuffle_is_deterministic(seed in any::<u64>()) {
        let config = MovementConfig::default();
        let mut a = ScheduleGenerator::with_seed(seed);
        let mut b = ScheduleGenerator::with_seed(seed);
        for _ in 0..3 {
            prop_assert_eq!(
                a.generate(TickMode::Vetinari, &config).unwrap(),
                b.generate(TickMode::Vetinari, &config).unwrap()
            );
        }
    }

    /// Uniform ticks are accepted exactly when they fit the budget.
    #[test]
    fn steady_budget_boundary(tick_ms in 31u32..2000) {
        let config = MovementConfig {
            steady_tick_ms: tick_ms,
            ..Default::default()
        };
        let result = ScheduleGenerator::with_seed(0).generate(TickMode::Steady, &config);
        let fits = tick_ms * SCHEDULE_LEN as u32 <= config.budget_ms();

        match result {
            Ok(Some(_)) => prop_assert!(fits),
            Err(ScheduleError::Overrun { sum_ms, budget_ms, .. }) => {
                prop_assert!(!fits);
                prop_assert!(sum_ms > budget_ms);
            }
            Ok(None) => prop_assert!(false, "steady produced no schedule"),
        }
    }
}
