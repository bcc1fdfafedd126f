//! Types for circuit breaking

use crate::config::BreakerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected until the cooldown elapses
    Open,
    /// Trial calls decide whether to close again
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Effective settings of one breaker
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSettings {
    /// Per-call deadline
    pub timeout: Duration,
    /// Consecutive failures that trip a closed breaker, and consecutive
    /// half-open successes that close it
    pub threshold: u32,
    /// OPEN -> HALF_OPEN cooldown in milliseconds
    pub reset_timeout_ms: i64,
    /// Outcome retention in milliseconds
    pub rolling_window_ms: i64,
    /// Samples required before the error rate is evaluated
    pub volume_threshold: u32,
    /// Error percentage that trips a closed breaker
    pub error_threshold: f64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default(), "")
    }
}

impl BreakerSettings {
    /// Defaults from `config` with the override for `name` applied
    pub fn from_config(config: &BreakerConfig, name: &str) -> Self {
        let overrides = config.overrides.get(name).cloned().unwrap_or_default();
        Self {
            timeout: Duration::from_millis(overrides.timeout_ms.unwrap_or(config.timeout_ms)),
            threshold: overrides.threshold.unwrap_or(config.threshold).max(1),
            reset_timeout_ms: overrides
                .reset_timeout_ms
                .unwrap_or(config.reset_timeout_ms) as i64,
            rolling_window_ms: config.rolling_window_ms as i64,
            volume_threshold: overrides
                .volume_threshold
                .unwrap_or(config.volume_threshold),
            error_threshold: overrides
                .error_threshold
                .unwrap_or(config.error_threshold),
        }
    }
}

/// One recorded call outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub success: bool,
}

/// A state change of one breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Events published by the breaker manager
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakerEvent {
    /// A breaker changed state
    StateChanged {
        name: String,
        from: CircuitState,
        to: CircuitState,
        timestamp: i64,
    },
    /// A call was rejected while the breaker was open
    Rejected { name: String, next_attempt: i64 },
}

/// Point-in-time statistics of one breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStats {
    pub name: String,
    pub state: CircuitState,
    /// Consecutive failures
    pub failure_count: u32,
    /// Consecutive successes while half-open
    pub success_count: u32,
    /// Calls within the rolling window
    pub total_requests: usize,
    /// Failed calls within the rolling window
    pub failed_requests: usize,
    /// Failure percentage within the rolling window
    pub error_rate: f64,
    pub last_failure_time: Option<i64>,
    pub next_attempt: Option<i64>,
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
