use rand::Rng;
use std::time::Duration;

/// Reconnect backoff for one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay (jitter included)
    pub max_delay: Duration,
    /// Random extra delay, drawn from `[0, max_jitter)`
    pub max_jitter: Duration,
    /// Reconnect attempts allowed before the subscription parks in `error`
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_jitter: Duration::from_millis(500),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    pub fn from_millis(base_ms: u64, max_ms: u64, jitter_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
            max_jitter: Duration::from_millis(jitter_ms),
            max_attempts,
        }
    }

    /// `min(base * 2^attempt + random(0, jitter), max)`
    #[must_use]
    pub fn delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let exponential = base.saturating_mul(factor);

        let max_jitter = self.max_jitter.as_millis() as u64;
        let jitter = if max_jitter == 0 {
            0
        } else {
            rng.random_range(0..max_jitter)
        };

        let delay = exponential.saturating_add(jitter);
        Duration::from_millis(delay.min(self.max_delay.as_millis() as u64))
    }

    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_first_attempt_is_base_plus_jitter() {
        let policy = ReconnectPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let delay = policy.delay(0, &mut rng);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_delay_is_clamped() {
        let policy = ReconnectPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(policy.delay(5, &mut rng), Duration::from_millis(30_000));
        assert_eq!(policy.delay(63, &mut rng), Duration::from_millis(30_000));
        assert_eq!(policy.delay(200, &mut rng), Duration::from_millis(30_000));
    }

    #[test]
    fn test_delay_doubles_without_jitter() {
        let policy = ReconnectPolicy::from_millis(100, 10_000, 0, 3);
        let mut rng = StdRng::seed_from_u64(1);

        let delays: Vec<u128> = (0..4).map(|a| policy.delay(a, &mut rng).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800]);
        assert!(policy.can_retry(2));
        assert!(!policy.can_retry(3));
    }
}
