//! Media engine credentials.

use serde::{Deserialize, Serialize};

/// Engine connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Application identifier issued by the media provider. Required to join.
    pub app_id: String,
    /// Optional channel token. Empty means token-less join.
    pub token: String,
}

impl EngineConfig {
    pub fn token(&self) -> Option<&str> {
        if self.token.is_empty() {
            None
        } else {
            Some(&self.token)
        }
    }
}
