//! Reconnect delay policy.

use std::time::Duration;

/// Delay applied between an unexpected close and the next connection attempt.
///
/// The default retries forever on a fixed 5 second delay. Exponential growth
/// and an attempt limit are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect after a drop.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure. `1` keeps the delay fixed.
    pub multiplier: u32,
    /// Consecutive failures tolerated before giving up. `None` is unlimited.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(5000))
    }
}

impl ReconnectPolicy {
    /// Same delay for every attempt.
    pub fn fixed(delay: Duration) -> Self {
        Self { initial_delay: delay, max_delay: delay, multiplier: 1, max_attempts: None }
    }

    /// Doubling delay starting at `initial`, capped at `max`.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self { initial_delay: initial, max_delay: max, multiplier: 2, max_attempts: None }
    }

    /// Limit the number of consecutive reconnects.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay before reconnect number `failures` (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(failures.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether reconnect number `failures` (1-based) may be scheduled.
    pub fn allows(&self, failures: u32) -> bool {
        self.max_attempts.is_none_or(|max| failures <= max)
    }
}
