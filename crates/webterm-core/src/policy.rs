//! Reconnection backoff policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff policy for reconnecting a dropped socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Attempts made before giving up
    pub max_attempts: u32,
    /// Multiplier applied per attempt
    pub backoff_factor: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_attempts: 10,
            backoff_factor: 2,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (0-indexed).
    ///
    /// `min(base * factor^attempt, max)`, saturating instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let growth = u64::from(self.backoff_factor).saturating_pow(attempt);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(growth)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Whether another attempt may be scheduled after `attempts` attempts.
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Validate policy values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_attempts == 0 {
            return Err(crate::Error::Config(
                "reconnect.max_attempts must be > 0".to_string(),
            ));
        }
        if self.backoff_factor == 0 {
            return Err(crate::Error::Config(
                "reconnect.backoff_factor must be >= 1".to_string(),
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(crate::Error::Config(format!(
                "reconnect.base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}
