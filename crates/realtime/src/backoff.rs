//! Retry pacing for the live-update channel.

use std::time::Duration;

const FIRST_RETRY: Duration = Duration::from_secs(1);
const RETRY_CEILING: Duration = Duration::from_secs(30);

/// Delay generator for reconnect attempts: starts at one second, doubles
/// per failed attempt, and holds at a thirty-second ceiling. A successful
/// connect resets it so the next drop starts over from one second.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self { next: FIRST_RETRY }
    }

    /// Delay to wait before the next attempt; advances the generator.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = (current * 2).min(RETRY_CEILING);
        current
    }

    pub fn reset(&mut self) {
        self.next = FIRST_RETRY;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
