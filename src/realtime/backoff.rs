//! Reconnect Backoff Module
//!
//! Exponential backoff schedule for the realtime channel:
//! `delay = min(base * 2^(attempt-1), max)`, capped at a fixed number of
//! attempts. Beyond the cap no further retry is offered until the
//! policy is reset by a successful connection or an explicit
//! `connect()`.

use std::time::Duration;

// == Defaults ==
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

// == Reconnect Policy ==
/// Tracks reconnection attempts and computes the next delay.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    // == Constructor ==
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            attempts: 0,
        }
    }

    // == Next Delay ==
    /// Returns the delay before the next attempt, or `None` once the
    /// attempt cap is reached. Each call counts as one scheduled retry.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;

        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << (self.attempts - 1).min(63));
        Some(Duration::from_millis(
            delay_ms.min(self.max_delay.as_millis() as u64),
        ))
    }

    // == Reset ==
    /// Clears the attempt counter; called on a successful connection and
    /// on manual disconnect.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Number of retries scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_ATTEMPTS)
    }
}
