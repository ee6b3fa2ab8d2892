use std::time::Duration;

use connex_common::config::DEFAULT_RETRY_DELAY;
use serde::{Deserialize, Serialize};

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct FrameworkConfig {
    /// Interval in milliseconds between two head pulls
    /// By default, the polling strategy of the driver is used
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Delay in milliseconds before pulling again after a failure
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_retry_delay_ms()))]
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Check every driver response and report malformed ones in logs
    /// Meant for development, responses are returned untouched
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub guard_driver: bool,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: None,
            retry_delay_ms: default_retry_delay_ms(),
            guard_driver: false,
        }
    }
}

impl FrameworkConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
