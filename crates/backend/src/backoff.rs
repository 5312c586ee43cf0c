use std::time::Duration;

/// Exponential backoff between retry attempts: `min(initial * 2^n, max)`
/// where `n` is the attempt index. Defaults match the backend retry policy
/// (100ms initial, capped at 2s).
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current_attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay_ms = self
            .initial
            .as_millis()
            .saturating_mul(1u128 << self.current_attempt.min(32))
            .min(self.max.as_millis());

        self.current_attempt += 1;
        Duration::from_millis(delay_ms as u64)
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_millis(2000))
    }
}
