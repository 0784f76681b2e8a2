//! Call-lifecycle REST service settings.

use serde::{Deserialize, Serialize};

/// Where call metadata (start/join/leave/end) is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Bearer token sent with every request. Empty means no auth header.
    pub auth_token: String,
    /// Per-request timeout in seconds (valid range: 1-120).
    pub request_timeout_secs: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            auth_token: String::new(),
            request_timeout_secs: 10,
        }
    }
}
