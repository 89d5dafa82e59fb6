use std::time::Duration;

/// Exponential backoff: `base * 2^attempt`, optionally capped.
///
/// Attempts are zero-based, so the first wait equals `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Option<Duration>,
}

impl ExponentialBackoff {
    pub const fn new(base: Duration) -> Self {
        Self { base, max_delay: None }
    }

    /// Cap every computed delay at `max_delay`.
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay to wait before retry number `attempt` (zero-based).
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self.base.checked_mul(factor).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_base() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100));

        assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(400));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn zero_base_never_waits() {
        let backoff = ExponentialBackoff::new(Duration::ZERO);
        assert!((0..10).all(|attempt| backoff.delay_for(attempt).is_zero()));
    }

    #[test]
    fn respects_cap() {
        let backoff =
            ExponentialBackoff::new(Duration::from_secs(1)).with_max_delay(Duration::from_secs(5));

        assert_eq!(backoff.delay_for(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(5));
        assert_eq!(backoff.delay_for(20), Duration::from_secs(5));
    }

    #[test]
    fn huge_attempts_saturate() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1));
        assert_eq!(backoff.delay_for(200), Duration::MAX);
    }
}
