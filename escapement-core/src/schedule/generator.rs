//! Schedule generator
//!
//! Expands a mode's [`Pattern`] into a [`PulseSchedule`] and rejects
//! schedules that would overrun the minute.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::templates::outlier_table;
use crate::config::{MovementConfig, SCHEDULE_LEN};
use crate::error::ScheduleError;
use crate::mode::{Pattern, TickMode};

/// Intervals between successive pulses of one minute
///
/// Entry `i` is the time from the pulse that moved the hand to position
/// `i` to the pulse that moves it to `i + 1`, measured start to start.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseSchedule {
    intervals: [u32; SCHEDULE_LEN],
}

impl PulseSchedule {
    /// Every interval the same
    pub fn uniform(interval_ms: u32) -> Self {
        Self {
            intervals: [interval_ms; SCHEDULE_LEN],
        }
    }

    pub fn from_intervals(intervals: [u32; SCHEDULE_LEN]) -> Self {
        Self { intervals }
    }

    pub fn intervals(&self) -> &[u32; SCHEDULE_LEN] {
        &self.intervals
    }

    pub fn interval(&self, index: u16) -> Option<u32> {
        self.intervals.get(usize::from(index)).copied()
    }

    /// Sum of all intervals
    pub fn total_ms(&self) -> u32 {
        self.intervals.iter().sum()
    }

    /// Time from the boundary pulse until the pulse fired at `index` is due
    ///
    /// Returns `None` past the end of the table.
    pub fn due_offset_ms(&self, index: u16) -> Option<u32> {
        let end = usize::from(index) + 1;
        self.intervals.get(..end).map(|head| head.iter().sum())
    }

    /// Check the schedule fits the minute budget for `mode`
    pub fn check_budget(
        &self,
        mode: TickMode,
        config: &MovementConfig,
    ) -> Result<(), ScheduleError> {
        let sum_ms = self.total_ms();
        let budget_ms = config.budget_ms();
        if sum_ms > budget_ms {
            return Err(ScheduleError::Overrun {
                mode,
                sum_ms,
                budget_ms,
            });
        }
        Ok(())
    }
}

/// Produces a fresh schedule every minute
///
/// The shuffle source is seeded once; two generators with the same seed
/// produce the same sequence of schedules.
#[derive(Debug, Clone)]
pub struct ScheduleGenerator {
    rng: SmallRng,
}

impl ScheduleGenerator {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Generate the schedule for the next minute
    ///
    /// Positioning modes have no schedule and yield `Ok(None)`.
    pub fn generate(
        &mut self,
        mode: TickMode,
        config: &MovementConfig,
    ) -> Result<Option<PulseSchedule>, ScheduleError> {
        let schedule = match mode.behavior().pattern {
            Pattern::FreeRunning(_) => return Ok(None),
            Pattern::Uniform(tick) => PulseSchedule::uniform(tick.ms(config)),
            Pattern::Shuffled(template) => {
                let mut intervals = *template;
                self.shuffle(&mut intervals);
                PulseSchedule::from_intervals(intervals)
            }
            Pattern::Outlier {
                base_ms,
                outlier_ms,
            } => {
                let mut intervals = outlier_table(base_ms, outlier_ms);
                self.shuffle(&mut intervals);
                PulseSchedule::from_intervals(intervals)
            }
        };

        schedule.check_budget(mode, config)?;
        Ok(Some(schedule))
    }

    /// Uniform Fisher-Yates shuffle
    fn shuffle(&mut self, intervals: &mut [u32]) {
        for i in (1..intervals.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            intervals.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::templates::{
        HESITATE_PAUSE_MS, STUMBLE_BURST_MS, VETINARI_TEMPLATE,
    };

    fn sorted(schedule: &PulseSchedule) -> [u32; SCHEDULE_LEN] {
        let mut intervals = *schedule.intervals();
        intervals.sort_unstable();
        intervals
    }

    #[test]
    fn test_steady_schedule() {
        let config = MovementConfig::default();
        let mut generator = ScheduleGenerator::with_seed(1);
        let schedule = generator
            .generate(TickMode::Steady, &config)
            .unwrap()
            .unwrap();

        assert!(schedule.intervals().iter().all(|&ms| ms == 1000));
        assert_eq!(schedule.total_ms(), 59_000);
        assert!(schedule.total_ms() <= config.budget_ms());
    }

    #[test]
    fn test_rush_wait_finishes_early() {
        let config = MovementConfig::default();
        let mut generator = ScheduleGenerator::with_seed(1);
        let schedule = generator
            .generate(TickMode::RushWait, &config)
            .unwrap()
            .unwrap();

        assert_eq!(schedule.total_ms(), 59 * 800);
    }

    #[test]
    fn test_vetinari_is_permutation_of_template() {
        let config = MovementConfig::default();
        let mut generator = ScheduleGenerator::with_seed(42);
        let schedule = generator
            .generate(TickMode::Vetinari, &config)
            .unwrap()
            .unwrap();

        assert_eq!(sorted(&schedule), VETINARI_TEMPLATE);
        assert_eq!(schedule.total_ms(), 58_587);
    }

    #[test]
    fn test_outlier_modes_keep_single_outlier() {
        let config = MovementConfig::default();
        let mut generator = ScheduleGenerator::with_seed(7);

        let hesitate = generator
            .generate(TickMode::Hesitate, &config)
            .unwrap()
            .unwrap();
        let pauses = hesitate
            .intervals()
            .iter()
            .filter(|&&ms| ms == HESITATE_PAUSE_MS)
            .count();
        assert_eq!(pauses, 1);

        let stumble = generator
            .generate(TickMode::Stumble, &config)
            .unwrap()
            .unwrap();
        let bursts = stumble
            .intervals()
            .iter()
            .filter(|&&ms| ms == STUMBLE_BURST_MS)
            .count();
        assert_eq!(bursts, 1);
    }

    #[test]
    fn test_positioning_has_no_schedule() {
        let config = MovementConfig::default();
        let mut generator = ScheduleGenerator::with_seed(1);
        assert_eq!(generator.generate(TickMode::Sprint, &config), Ok(None));
        assert_eq!(generator.generate(TickMode::Crawl, &config), Ok(None));
    }

    #[test]
    fn test_same_seed_same_permutation() {
        let config = MovementConfig::default();
        let mut a = ScheduleGenerator::with_seed(0xC10C);
        let mut b = ScheduleGenerator::with_seed(0xC10C);

        for _ in 0..3 {
            assert_eq!(
                a.generate(TickMode::Vetinari, &config),
                b.generate(TickMode::Vetinari, &config)
            );
        }
    }

    #[test]
    fn test_regeneration_reshuffles() {
        let config = MovementConfig::default();
        let mut generator = ScheduleGenerator::with_seed(3);
        let first = generator.generate(TickMode::Vetinari, &config).unwrap();
        let second = generator.generate(TickMode::Vetinari, &config).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_overrun_rejected() {
        let config = MovementConfig {
            steady_tick_ms: 1020,
            ..Default::default()
        };
        let mut generator = ScheduleGenerator::with_seed(1);
        assert_eq!(
            generator.generate(TickMode::Steady, &config),
            Err(ScheduleError::Overrun {
                mode: TickMode::Steady,
                sum_ms: 59 * 1020,
                budget_ms: 59_800,
            })
        );
    }

    #[test]
    fn test_due_offsets_accumulate() {
        let schedule = PulseSchedule::uniform(1000);
        assert_eq!(schedule.due_offset_ms(0), Some(1000));
        assert_eq!(schedule.due_offset_ms(58), Some(59_000));
        assert_eq!(schedule.due_offset_ms(59), None);
    }
}
