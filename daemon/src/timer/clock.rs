//! Wall-clock elapsed time measurement for the tick source
//!
//! The interval fires several times a second, and scheduling delay means it
//! never fires exactly on time. Instead of decrementing by a constant, each
//! tick reports how many whole seconds actually passed since the last
//! reported second. The sub-second remainder is carried forward.

use std::time::Duration;

use tokio::time::Instant;

/// Converts instants into whole elapsed seconds
#[derive(Debug, Clone, Copy)]
pub struct ElapsedClock {
    /// Instant up to which elapsed time has been reported
    reported_until: Instant,
}

impl ElapsedClock {
    /// Start measuring from `now`
    pub fn new(now: Instant) -> Self {
        Self {
            reported_until: now,
        }
    }

    /// Whole seconds elapsed since the last call, carrying any fraction
    pub fn advance(&mut self, now: Instant) -> u64 {
        let whole = now.saturating_duration_since(self.reported_until).as_secs();
        if whole > 0 {
            self.reported_until += Duration::from_secs(whole);
        }
        whole
    }
}
