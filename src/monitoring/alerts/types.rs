//! Alert types

use crate::monitoring::health::MonitorEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        })
    }
}

/// One raised alert
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    /// Type tag, e.g. `service_down` or `high_cpu`
    pub kind: String,
    pub severity: AlertSeverity,
    /// Service id or `system`
    pub source: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    fn new(
        kind: &str,
        severity: AlertSeverity,
        source: &str,
        title: String,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            severity,
            source: source.to_string(),
            title,
            description,
            timestamp: Utc::now(),
        }
    }

    /// Alert for a monitor event, if the event warrants one
    pub fn from_event(event: &MonitorEvent) -> Option<Self> {
        match event {
            MonitorEvent::CheckCompleted { .. } => None,
            MonitorEvent::AlertTriggered {
                service,
                critical,
                consecutive_failures,
                error,
            } => Some(Self::new(
                "service_down",
                if *critical {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                },
                service,
                format!("Service {} is failing health checks", service),
                format!(
                    "{} consecutive failures{}",
                    consecutive_failures,
                    error.as_deref().map(|e| format!(": {}", e)).unwrap_or_default()
                ),
            )),
            MonitorEvent::ServiceRecovered { service, .. } => Some(Self::new(
                "service_recovered",
                AlertSeverity::Info,
                service,
                format!("Service {} recovered", service),
                "Health check passed after an alert".to_string(),
            )),
            MonitorEvent::ResourceAlert {
                kind,
                value,
                threshold,
            } => Some(Self::new(
                kind.alert_tag(),
                AlertSeverity::Warning,
                "system",
                format!("{} above threshold", kind),
                format!("{:.1} >= {:.1}", value, threshold),
            )),
        }
    }
}

/// Alert statistics
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total_alerts: u64,
    pub alerts_by_severity: HashMap<String, u64>,
    pub alerts_by_kind: HashMap<String, u64>,
    pub failed_notifications: u64,
    pub last_alert: Option<DateTime<Utc>>,
}
