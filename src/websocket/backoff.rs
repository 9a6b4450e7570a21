//! Exponential reconnect backoff with a bounded number of attempts.

use std::time::Duration;

/// Reconnect schedule: starts at `floor`, doubles after every scheduled
/// retry up to `ceiling`, and gives up after `max_attempts` retries.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    max_attempts: u32,
    attempts: u32,
    current: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(floor: Duration, ceiling: Duration, max_attempts: u32) -> Self {
        Self {
            floor,
            ceiling,
            max_attempts,
            attempts: 0,
            current: floor,
        }
    }

    /// Schedules the next retry.
    ///
    /// Returns the delay to wait before reconnecting, or `None` once
    /// `max_attempts` retries have been handed out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }

        self.attempts += 1;
        let delay = self.current;
        self.current = (self.current * 2).min(self.ceiling);
        Some(delay)
    }

    /// Resets the counter and delay after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current = self.floor;
    }

    /// Retries handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
