use std::time::Duration;

/// Bounded exponential backoff for rate-limited upstream calls.
///
/// After failed attempt `n` (1-based) the caller waits `base_delay * 2^n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts including the first one. Zero behaves as one.
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 4,
      base_delay: Duration::from_secs(1),
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
    Self {
      max_attempts,
      base_delay,
    }
  }

  pub fn attempts(&self) -> u32 {
    self.max_attempts.max(1)
  }

  /// Delay to wait after failed attempt number `attempt`.
  pub fn backoff(&self, attempt: u32) -> Duration {
    self
      .base_delay
      .saturating_mul(2u32.saturating_pow(attempt))
  }
}
