//! Rate limiting configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Fixed-window, per-client rate limiting backed by the persistent store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Window length in milliseconds
    #[serde(default = "default_rate_limit_window_ms")]
    pub window_ms: u64,
    /// Requests allowed per client per window
    #[serde(default = "default_rate_limit_max")]
    pub max_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: default_rate_limit_window_ms(),
            max_requests: default_rate_limit_max(),
        }
    }
}
