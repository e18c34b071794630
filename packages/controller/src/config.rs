//! Controller configuration.

use std::time::Duration;

/// Environment variable overriding [`ControllerConfig::resync_interval`], in seconds.
pub const RESYNC_SECS_ENV: &str = "QUEUE_CONTROLLER_RESYNC_SECS";
/// Environment variable overriding [`ControllerConfig::retry_base_delay`], in milliseconds.
pub const RETRY_BASE_MS_ENV: &str = "QUEUE_CONTROLLER_RETRY_BASE_MS";
/// Environment variable overriding [`ControllerConfig::retry_max_delay`], in milliseconds.
pub const RETRY_MAX_MS_ENV: &str = "QUEUE_CONTROLLER_RETRY_MAX_MS";

/// Timing knobs for the dispatcher actors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// How often every stored queue gets a `SyncQueue`.
    pub resync_interval: Duration,
    /// Delay before the first retry of a failed reconcile.
    pub retry_base_delay: Duration,
    /// Upper bound for the retry delay.
    pub retry_max_delay: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(30),
            retry_base_delay: Duration::from_millis(200),
            retry_max_delay: Duration::from_secs(60),
            event_capacity: 1024,
        }
    }
}

impl ControllerConfig {
    /// Defaults overridden by any valid `QUEUE_CONTROLLER_*` variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            resync_interval: env_u64(RESYNC_SECS_ENV)
                .map(Duration::from_secs)
                .unwrap_or(defaults.resync_interval),
            retry_base_delay: env_u64(RETRY_BASE_MS_ENV)
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            retry_max_delay: env_u64(RETRY_MAX_MS_ENV)
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_max_delay),
            event_capacity: defaults.event_capacity,
        }
    }

    /// Set the resync interval.
    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = interval;
        self
    }

    /// Set the retry delays.
    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    /// Delay before retry number `attempt` (0-based): the base delay doubled
    /// per attempt, capped at the max delay.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.retry_max_delay)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
        Ok(value) => Some(value),
    }
}
