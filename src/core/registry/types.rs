//! Service registry data model

use crate::config::{default_gateway_group, default_health_path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a service is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// GET on the health endpoint
    #[default]
    Http,
    /// Raw TCP connect to the endpoint's host and port
    Tcp,
    /// Local process existence
    Process,
    /// Caller-registered predicate
    Custom,
}

/// Registration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Registered,
    /// Last check found the service healthy
    Healthy,
    ShuttingDown,
}

/// Health classification of one service, or of the whole gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Healthy and degraded services answered their check
    pub fn is_reachable(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }

    /// Numeric encoding used by metrics exporters
    pub fn as_gauge(&self) -> f64 {
        match self {
            HealthStatus::Healthy => 1.0,
            HealthStatus::Degraded => 0.5,
            HealthStatus::Unhealthy | HealthStatus::Unknown => 0.0,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            response_time_ms,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn unhealthy(response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time_ms,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: HealthStatus) -> Self {
        self.status = status;
        self
    }
}

/// Rolling check statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    pub total_checks: u64,
    pub successful_checks: u64,
    /// Mean response time in milliseconds
    pub average_response_time: f64,
    /// Share of successful checks in percent
    pub uptime_percent: f64,
}

impl ServiceMetrics {
    /// Fold one check outcome into the aggregates
    pub fn record(&mut self, reachable: bool, response_time_ms: u64) {
        self.total_checks += 1;
        if reachable {
            self.successful_checks += 1;
        }
        let n = self.total_checks as f64;
        self.average_response_time += (response_time_ms as f64 - self.average_response_time) / n;
        self.uptime_percent = self.successful_checks as f64 * 100.0 / n;
    }
}

/// Static metadata supplied when a service registers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub id: String,
    #[serde(default = "default_gateway_group", alias = "gatewayGroup")]
    pub gateway_group: String,
    /// Base URL, e.g. `http://localhost:3002`
    pub endpoint: String,
    #[serde(default = "default_health_path", alias = "healthEndpoint")]
    pub health_endpoint: String,
    /// Lower values come first in topology order
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    #[serde(default)]
    pub critical: bool,
    #[serde(default, alias = "checkType")]
    pub check_type: CheckKind,
    /// Process name for process checks; defaults to the id
    #[serde(default, alias = "processName")]
    pub process_name: Option<String>,
}

impl ServiceRegistration {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gateway_group: default_gateway_group(),
            endpoint: endpoint.into(),
            health_endpoint: default_health_path(),
            priority: 0,
            dependencies: BTreeSet::new(),
            critical: false,
            check_type: CheckKind::Http,
            process_name: None,
        }
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.gateway_group = group.into();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn check(mut self, check_type: CheckKind) -> Self {
        self.check_type = check_type;
        self
    }
}

/// The registry's record of one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub id: String,
    pub gateway_group: String,
    pub endpoint: String,
    pub health_endpoint: String,
    pub priority: i32,
    pub dependencies: BTreeSet<String>,
    pub critical: bool,
    pub check_type: CheckKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    pub status: ServiceStatus,
    pub health: HealthStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub metrics: ServiceMetrics,
    pub registered_at: DateTime<Utc>,
}

impl ServiceDescriptor {
    pub fn from_registration(registration: ServiceRegistration) -> Self {
        Self {
            id: registration.id,
            gateway_group: registration.gateway_group,
            endpoint: registration.endpoint,
            health_endpoint: registration.health_endpoint,
            priority: registration.priority,
            dependencies: registration.dependencies,
            critical: registration.critical,
            check_type: registration.check_type,
            process_name: registration.process_name,
            status: ServiceStatus::Registered,
            health: HealthStatus::Unknown,
            last_check: None,
            consecutive_failures: 0,
            metrics: ServiceMetrics::default(),
            registered_at: Utc::now(),
        }
    }

    /// Replace static metadata, keeping runtime state
    pub fn refresh(&mut self, registration: ServiceRegistration) {
        self.gateway_group = registration.gateway_group;
        self.endpoint = registration.endpoint;
        self.health_endpoint = registration.health_endpoint;
        self.priority = registration.priority;
        self.dependencies = registration.dependencies;
        self.critical = registration.critical;
        self.check_type = registration.check_type;
        self.process_name = registration.process_name;
        self.status = ServiceStatus::Registered;
    }

    /// Full URL of the health endpoint
    pub fn health_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if self.health_endpoint.starts_with('/') {
            format!("{}{}", base, self.health_endpoint)
        } else {
            format!("{}/{}", base, self.health_endpoint)
        }
    }

    pub fn process_name(&self) -> &str {
        self.process_name.as_deref().unwrap_or(&self.id)
    }
}

/// Result of folding one check into a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckRecord {
    pub previous: HealthStatus,
    pub current: HealthStatus,
    pub consecutive_failures: u32,
}

/// Typed registry notifications
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    Registered {
        id: String,
    },
    Deregistered {
        id: String,
    },
    /// Fired only when the health value actually changes
    HealthChanged {
        id: String,
        old: HealthStatus,
        new: HealthStatus,
        details: Option<String>,
    },
}

/// Dependencies and dependents of one service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}
