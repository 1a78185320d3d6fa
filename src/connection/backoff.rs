use std::time::Duration;

/// Exponential reconnect schedule
///
/// Attempt `n` (1-based) waits `base_delay * 2^(n-1)`; there is no attempt
/// after `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Delay before attempt `attempt`, or `None` once the budget is spent
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Every delay the policy will ever produce, in order
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_attempts).filter_map(move |attempt| self.delay_for(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = ReconnectPolicy::new(Duration::from_millis(250), 4);

        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(250)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(2000)));
    }

    #[test]
    fn test_no_delay_outside_budget() {
        let policy = ReconnectPolicy::new(Duration::from_millis(250), 4);

        assert_eq!(policy.delay_for(0), None);
        assert_eq!(policy.delay_for(5), None);
        assert_eq!(policy.schedule().count(), 4);
    }

    #[test]
    fn test_schedule_strictly_doubles() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<Duration> = policy.schedule().collect();

        for pair in delays.windows(2) {
            assert_eq!(pair[1], pair[0] * 2);
        }
    }

    #[test]
    fn test_large_attempt_saturates() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), 100);
        assert!(policy.delay_for(64).is_some());
    }
}
