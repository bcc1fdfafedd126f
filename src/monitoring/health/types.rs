//! Health monitor events and reports

use crate::monitoring::system::{ResourceKind, SystemSample};
use crate::core::registry::{HealthCheckResult, HealthStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Events raised by the health monitor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// One check finished and was written to the registry
    CheckCompleted {
        service: String,
        result: HealthCheckResult,
    },
    /// Consecutive failures reached the alert threshold
    AlertTriggered {
        service: String,
        critical: bool,
        consecutive_failures: u32,
        error: Option<String>,
    },
    /// An alerted service passed a check again
    ServiceRecovered { service: String, critical: bool },
    /// A resource sample crossed its threshold
    ResourceAlert {
        kind: ResourceKind,
        value: f64,
        threshold: f64,
    },
}

/// Per-service line of the aggregate report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthSummary {
    pub id: String,
    pub health: HealthStatus,
    pub critical: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub average_response_time: f64,
    pub uptime_percent: f64,
    pub total_checks: u64,
}

/// Counts by health value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCounts {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub unknown: usize,
}

/// Aggregate health, computed on demand
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub summary: HealthCounts,
    pub services: Vec<ServiceHealthSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemSample>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
