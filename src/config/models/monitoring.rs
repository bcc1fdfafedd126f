//! Health monitoring configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Per-service check interval in milliseconds
    #[serde(default = "default_check_interval_ms")]
    pub interval_ms: u64,
    /// Per-attempt check timeout in milliseconds
    #[serde(default = "default_check_timeout_ms")]
    pub timeout_ms: u64,
    /// Attempts per check (at least one)
    #[serde(default = "default_check_retries")]
    pub retries: u32,
    /// Linear backoff base between attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Consecutive failures that raise an alert
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u32,
    /// Retention of per-service check history
    #[serde(default = "default_history_window_ms")]
    pub history_window_ms: u64,
    /// System resource sampling interval
    #[serde(default = "default_system_interval_ms")]
    pub system_interval_ms: u64,
    /// Alert thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Alert delivery
    #[serde(default)]
    pub alerting: AlertingConfig,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_check_interval_ms(),
            timeout_ms: default_check_timeout_ms(),
            retries: default_check_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            alert_threshold: default_alert_threshold(),
            history_window_ms: default_history_window_ms(),
            system_interval_ms: default_system_interval_ms(),
            thresholds: ThresholdConfig::default(),
            alerting: AlertingConfig::default(),
        }
    }
}

impl MonitoringConfig {
    /// Validate monitoring configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("Health check interval must be positive".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("Health check timeout must be positive".to_string());
        }
        self.thresholds.validate()
    }
}

/// Resource and latency thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdConfig {
    /// CPU usage percentage
    #[serde(default = "default_cpu_threshold")]
    pub cpu: f64,
    /// Memory usage percentage
    #[serde(default = "default_memory_threshold")]
    pub memory: f64,
    /// Disk usage percentage
    #[serde(default = "default_disk_threshold")]
    pub disk: f64,
    /// Response time above which a reachable service counts as degraded
    #[serde(default = "default_response_time_threshold")]
    pub response_time_ms: u64,
    /// Gateway error-rate percentage
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate: f64,
}

fn default_cpu_threshold() -> f64 {
    80.0
}

fn default_memory_threshold() -> f64 {
    85.0
}

fn default_disk_threshold() -> f64 {
    90.0
}

fn default_response_time_threshold() -> u64 {
    5_000
}

fn default_error_rate_threshold() -> f64 {
    10.0
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: default_cpu_threshold(),
            memory: default_memory_threshold(),
            disk: default_disk_threshold(),
            response_time_ms: default_response_time_threshold(),
            error_rate: default_error_rate_threshold(),
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("cpu", self.cpu),
            ("memory", self.memory),
            ("disk", self.disk),
            ("error_rate", self.error_rate),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("Threshold '{}' must be within 0..=100", name));
            }
        }
        Ok(())
    }
}

/// Alert delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertingConfig {
    /// Webhook receiving alert payloads (Slack-compatible)
    #[serde(default)]
    pub webhook_url: Option<String>,
}
