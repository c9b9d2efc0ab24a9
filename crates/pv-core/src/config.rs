//! Engine tuning

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Timing and capacity settings for a presenter session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How far past the requested position a slide change still counts as
    /// the active slide
    pub slide_look_ahead_ms: u64,

    /// Minimum time a slide must stay up to get its own TOC entry
    pub toc_min_dwell_ms: u64,

    /// Upper bound on the clock's sleep between ticks
    pub clock_max_poll_ms: u64,

    /// Clock sleep while the media is not playing
    pub clock_idle_poll_ms: u64,

    /// Lower bound on the clock's sleep between ticks
    pub clock_min_poll_ms: u64,

    /// How long the queue consumer waits for a signal before re-checking
    pub queue_wait_timeout_ms: u64,

    /// How long a backward jump waits for an in-flight replay to stop
    pub replay_cancel_timeout_ms: u64,

    /// Capacity of the notification channel
    pub notification_capacity: usize,

    /// How long a notification may block on a full channel before it is
    /// dropped
    pub notification_send_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slide_look_ahead_ms: 3_000,
            toc_min_dwell_ms: 3_000,
            clock_max_poll_ms: 1_000,
            clock_idle_poll_ms: 500,
            clock_min_poll_ms: 10,
            queue_wait_timeout_ms: 5_000,
            replay_cancel_timeout_ms: 2_000,
            notification_capacity: 256,
            notification_send_timeout_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.clock_min_poll_ms == 0 {
            return Err(EngineError::InvalidConfig("clock_min_poll_ms must be positive".into()));
        }
        if self.clock_min_poll_ms > self.clock_max_poll_ms {
            return Err(EngineError::InvalidConfig(format!(
                "clock_min_poll_ms ({}) exceeds clock_max_poll_ms ({})",
                self.clock_min_poll_ms, self.clock_max_poll_ms
            )));
        }
        if self.queue_wait_timeout_ms == 0 {
            return Err(EngineError::InvalidConfig("queue_wait_timeout_ms must be positive".into()));
        }
        if self.notification_capacity == 0 {
            return Err(EngineError::InvalidConfig("notification_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn slide_look_ahead(&self) -> Duration {
        Duration::from_millis(self.slide_look_ahead_ms)
    }

    pub fn toc_min_dwell(&self) -> Duration {
        Duration::from_millis(self.toc_min_dwell_ms)
    }

    pub fn clock_max_poll(&self) -> Duration {
        Duration::from_millis(self.clock_max_poll_ms)
    }

    pub fn clock_idle_poll(&self) -> Duration {
        Duration::from_millis(self.clock_idle_poll_ms)
    }

    pub fn clock_min_poll(&self) -> Duration {
        Duration::from_millis(self.clock_min_poll_ms)
    }

    pub fn queue_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_wait_timeout_ms)
    }

    pub fn replay_cancel_timeout(&self) -> Duration {
        Duration::from_millis(self.replay_cancel_timeout_ms)
    }

    pub fn notification_send_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_send_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slide_look_ahead(), Duration::from_secs(3));
        assert_eq!(config.replay_cancel_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"clock_max_poll_ms": 250}"#).unwrap();
        assert_eq!(config.clock_max_poll_ms, 250);
        assert_eq!(config.queue_wait_timeout_ms, 5_000);
    }

    #[test]
    fn test_invalid_poll_bounds() {
        let config = EngineConfig {
            clock_min_poll_ms: 2_000,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }
}
