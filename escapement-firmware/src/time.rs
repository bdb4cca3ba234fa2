//! Embassy-backed monotonic clock

use embassy_time::{block_for, Instant};
use escapement_core::traits::{Monotonic, Timer};

/// Milliseconds since boot from the embassy time driver
///
/// Pulse deadlines are waited on with a busy wait so a due pulse is never
/// held up by another task.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Monotonic for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

impl Timer for EmbassyClock {
    fn wait_until(&mut self, deadline_ms: u64) {
        let now = Instant::now();
        let deadline = Instant::from_millis(deadline_ms);
        if deadline > now {
            block_for(deadline - now);
        }
    }
}
