//! Circuit breaker defaults

use super::*;
use serde::{Deserialize, Serialize};

/// Circuit breaker configuration shared by every route unless overridden
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakerConfig {
    /// Per-call deadline in milliseconds
    #[serde(default = "default_breaker_timeout_ms")]
    pub timeout_ms: u64,
    /// Consecutive failures that trip the breaker, and consecutive
    /// half-open successes that close it again
    #[serde(default = "default_breaker_threshold")]
    pub threshold: u32,
    /// OPEN -> HALF_OPEN cooldown in milliseconds
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,
    /// Retention of call outcomes for error-rate statistics
    #[serde(default = "default_rolling_window_ms")]
    pub rolling_window_ms: u64,
    /// Minimum calls in the window before error rate is evaluated
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: u32,
    /// Error percentage (0-100) that trips CLOSED -> OPEN
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,
    /// Per-breaker overrides keyed by breaker name
    #[serde(default)]
    pub overrides: std::collections::HashMap<String, BreakerOverride>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_breaker_timeout_ms(),
            threshold: default_breaker_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            rolling_window_ms: default_rolling_window_ms(),
            volume_threshold: default_volume_threshold(),
            error_threshold: default_error_threshold(),
            overrides: std::collections::HashMap::new(),
        }
    }
}

/// Partial override of [`BreakerConfig`] for one breaker
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BreakerOverride {
    pub timeout_ms: Option<u64>,
    pub threshold: Option<u32>,
    pub reset_timeout_ms: Option<u64>,
    pub volume_threshold: Option<u32>,
    pub error_threshold: Option<f64>,
}

impl BreakerConfig {
    /// Validate breaker defaults
    pub fn validate(&self) -> Result<(), String> {
        if self.threshold == 0 {
            return Err("Circuit breaker threshold must be positive".to_string());
        }
        if !(0.0..=100.0).contains(&self.error_threshold) {
            return Err("Circuit breaker error_threshold must be within 0..=100".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("Circuit breaker timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}
