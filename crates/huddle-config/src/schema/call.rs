//! Call timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and intervals for the call lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// How long a second join waits for an in-flight join (valid range: 100-30000).
    pub join_wait_timeout_ms: u32,
    /// Upper bound on the network join itself (valid range: 1000-120000).
    pub join_timeout_ms: u32,
    /// Upper bound on camera/mic/screen acquisition (valid range: 1000-60000).
    pub acquisition_timeout_ms: u32,
    /// Call-duration tick interval (valid range: 100-10000).
    pub tick_interval_ms: u32,
}

impl CallConfig {
    pub fn join_wait_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.join_wait_timeout_ms))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.join_timeout_ms))
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.acquisition_timeout_ms))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.tick_interval_ms))
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            join_wait_timeout_ms: 3000,
            join_timeout_ms: 15000,
            acquisition_timeout_ms: 10000,
            tick_interval_ms: 1000,
        }
    }
}
