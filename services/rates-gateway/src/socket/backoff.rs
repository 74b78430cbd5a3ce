//! Capped exponential backoff

use std::time::Duration;

/// Reconnect delay schedule: doubles after every failure, never exceeding
/// the cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a schedule starting at `initial` and capped at `max`
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max, current: initial }
    }

    /// The delay to wait before the next attempt; advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Restart the schedule from the initial delay
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
