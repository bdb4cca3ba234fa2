//! Fixed interval tables for the shuffled modes

use crate::config::SCHEDULE_LEN;

/// Ascending 500..=1486 ms in 17 ms steps, 58 587 ms in total
///
/// Shuffled every minute, this leaves about 1.2 s of the budget for the
/// boundary pulse to absorb.
#[rustfmt::skip]
pub const VETINARI_TEMPLATE: [u32; SCHEDULE_LEN] = [
    500, 517, 534, 551, 568, 585, 602, 619, 636, 653,
    670, 687, 704, 721, 738, 755, 772, 789, 806, 823,
    840, 857, 874, 891, 908, 925, 942, 959, 976, 993,
    1010, 1027, 1044, 1061, 1078, 1095, 1112, 1129, 1146, 1163,
    1180, 1197, 1214, 1231, 1248, 1265, 1282, 1299, 1316, 1333,
    1350, 1367, 1384, 1401, 1418, 1435, 1452, 1469, 1486,
];

/// Hesitate: 58 quick ticks and one 6 s pause (58 200 ms)
pub const HESITATE_BASE_MS: u32 = 900;
pub const HESITATE_PAUSE_MS: u32 = 6000;

/// Stumble: 58 slightly slow ticks and one 100 ms double-step (58 680 ms)
pub const STUMBLE_BASE_MS: u32 = 1010;
pub const STUMBLE_BURST_MS: u32 = 100;

/// Table slot the outlier is written to before shuffling
pub const OUTLIER_INDEX: usize = SCHEDULE_LEN / 2;

/// Build an outlier table before it is shuffled
pub fn outlier_table(base_ms: u32, outlier_ms: u32) -> [u32; SCHEDULE_LEN] {
    let mut table = [base_ms; SCHEDULE_LEN];
    table[OUTLIER_INDEX] = outlier_ms;
    table
}
