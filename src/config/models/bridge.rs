//! Telegram-client bridge configuration

use super::*;
use serde::{Deserialize, Serialize};

/// External real-time update source and command target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Forward client commands and snapshot requests to the bridge
    #[serde(default)]
    pub enabled: bool,
    /// Bridge base URL
    #[serde(default = "default_bridge_url")]
    pub url: String,
    /// Pub/sub channel carrying bridge updates
    #[serde(default = "default_update_channel")]
    pub update_channel: String,
    /// Command timeout in milliseconds
    #[serde(default = "default_bridge_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_bridge_url() -> String {
    "http://localhost:3006".to_string()
}

fn default_bridge_timeout_ms() -> u64 {
    10_000
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_bridge_url(),
            update_channel: default_update_channel(),
            timeout_ms: default_bridge_timeout_ms(),
        }
    }
}
