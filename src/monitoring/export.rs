//! Metrics export
//!
//! Prometheus text, InfluxDB line protocol and JSON are all rendered from
//! one [`MetricsSnapshot`], so the formats never disagree.

use super::health::HealthReport;
use super::system::SystemSample;
use crate::core::broadcast::BroadcastStats;
use crate::core::circuit_breaker::{BreakerStats, CircuitState};
use crate::core::tracker::TrackerStats;
use crate::utils::error::{GatewayError, Result};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use std::fmt::Write;
use std::str::FromStr;

/// Supported export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Prometheus,
    Influx,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Prometheus => "text/plain; version=0.0.4; charset=utf-8",
            ExportFormat::Influx => "text/plain; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prometheus" | "prom" | "text" => Ok(ExportFormat::Prometheus),
            "influx" | "influxdb" => Ok(ExportFormat::Influx),
            "json" => Ok(ExportFormat::Json),
            other => Err(GatewayError::bad_request(format!(
                "unknown metrics format '{}', expected prometheus, influx or json",
                other
            ))),
        }
    }
}

/// Gateway-level counters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayMetrics {
    pub requests: TrackerStats,
    pub websocket: BroadcastStats,
    pub circuit_breakers: Vec<BreakerStats>,
}

/// Everything the exporters render
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub health: HealthReport,
    pub system: SystemSample,
    pub gateway: GatewayMetrics,
}

fn state_gauge(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    }
}

fn prom_error(e: prometheus::Error) -> GatewayError {
    GatewayError::Monitoring(format!("prometheus encoding failed: {}", e))
}

/// Escape a tag key or value for line protocol
fn influx_tag(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

impl MetricsSnapshot {
    pub fn new(
        health: HealthReport,
        system: SystemSample,
        requests: TrackerStats,
        websocket: BroadcastStats,
        circuit_breakers: Vec<BreakerStats>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            health,
            system,
            gateway: GatewayMetrics {
                requests,
                websocket,
                circuit_breakers,
            },
        }
    }

    /// Render in `format`, returning the body
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Prometheus => self.to_prometheus(),
            ExportFormat::Influx => Ok(self.to_influx()),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// Prometheus text exposition format
    pub fn to_prometheus(&self) -> Result<String> {
        let registry = Registry::new();
        let gauge = |name: &str, help: &str, labels: &[&str]| -> Result<GaugeVec> {
            let vec = GaugeVec::new(Opts::new(name, help), labels).map_err(prom_error)?;
            registry.register(Box::new(vec.clone())).map_err(prom_error)?;
            Ok(vec)
        };

        let overall = gauge(
            "gateway_health_status",
            "Aggregate gateway health (1 healthy, 0.5 degraded, 0 unhealthy)",
            &[],
        )?;
        overall
            .with_label_values::<&str>(&[])
            .set(self.health.status.as_gauge());

        let service_up = gauge(
            "service_health_status",
            "Service health (1 healthy, 0.5 degraded, 0 unhealthy or unknown)",
            &["service", "critical"],
        )?;
        let service_rt = gauge(
            "service_response_time_ms",
            "Average health check response time",
            &["service"],
        )?;
        let service_uptime = gauge(
            "service_uptime_percent",
            "Share of passed health checks",
            &["service"],
        )?;
        let service_failures = gauge(
            "service_consecutive_failures",
            "Consecutive failed health checks",
            &["service"],
        )?;
        for service in &self.health.services {
            let critical = if service.critical { "true" } else { "false" };
            service_up
                .with_label_values(&[service.id.as_str(), critical])
                .set(service.health.as_gauge());
            service_rt
                .with_label_values(&[service.id.as_str()])
                .set(service.average_response_time);
            service_uptime
                .with_label_values(&[service.id.as_str()])
                .set(service.uptime_percent);
            service_failures
                .with_label_values(&[service.id.as_str()])
                .set(f64::from(service.consecutive_failures));
        }

        let system = gauge("system_resource_usage_percent", "Host resource usage", &["resource"])?;
        system.with_label_values(&["cpu"]).set(self.system.cpu_percent);
        system.with_label_values(&["memory"]).set(self.system.memory_percent);
        system.with_label_values(&["disk"]).set(self.system.disk_percent);

        let requests = &self.gateway.requests;
        let gateway = gauge("gateway_requests", "Gateway request counters", &["kind"])?;
        gateway.with_label_values(&["total"]).set(requests.total_requests as f64);
        gateway.with_label_values(&["failed"]).set(requests.failed_requests as f64);
        gateway.with_label_values(&["in_flight"]).set(requests.in_flight as f64);
        gauge("gateway_request_duration_ms", "Average request duration", &[])?
            .with_label_values::<&str>(&[])
            .set(requests.average_duration_ms);
        gauge("gateway_error_rate_percent", "Share of requests answered with 5xx", &[])?
            .with_label_values::<&str>(&[])
            .set(requests.error_rate);
        gauge("gateway_websocket_clients", "Connected WebSocket clients", &[])?
            .with_label_values::<&str>(&[])
            .set(self.gateway.websocket.connected_clients as f64);

        let breaker_state = gauge(
            "circuit_breaker_state",
            "Breaker state (0 closed, 1 open, 2 half-open)",
            &["name"],
        )?;
        let breaker_errors = gauge(
            "circuit_breaker_error_rate_percent",
            "Failure share within the rolling window",
            &["name"],
        )?;
        for breaker in &self.gateway.circuit_breakers {
            breaker_state
                .with_label_values(&[breaker.name.as_str()])
                .set(state_gauge(breaker.state));
            breaker_errors
                .with_label_values(&[breaker.name.as_str()])
                .set(breaker.error_rate);
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(prom_error)?;
        String::from_utf8(buffer)
            .map_err(|e| GatewayError::Monitoring(format!("prometheus output not UTF-8: {}", e)))
    }

    /// InfluxDB line protocol, one measurement per group
    pub fn to_influx(&self) -> String {
        let ts = self.timestamp.timestamp_nanos_opt().unwrap_or_default();
        let mut out = String::new();

        for service in &self.health.services {
            let _ = writeln!(
                out,
                concat!(
                    "service_health,service={},critical={},status={} ",
                    "health={},response_time={},uptime={},",
                    "consecutive_failures={}i,total_checks={}i {}"
                ),
                influx_tag(&service.id),
                service.critical,
                service.health,
                service.health.as_gauge(),
                service.average_response_time,
                service.uptime_percent,
                service.consecutive_failures,
                service.total_checks,
                ts
            );
        }

        let _ = writeln!(
            out,
            "system_metrics cpu={},memory={},disk={},memory_used={}i {}",
            self.system.cpu_percent,
            self.system.memory_percent,
            self.system.disk_percent,
            self.system.memory_used_bytes,
            ts
        );

        let requests = &self.gateway.requests;
        let open_breakers = self
            .gateway
            .circuit_breakers
            .iter()
            .filter(|b| b.state == CircuitState::Open)
            .count();
        let _ = writeln!(
            out,
            concat!(
                "gateway_metrics,status={} ",
                "total_requests={}i,failed_requests={}i,in_flight={}i,",
                "avg_duration={},error_rate={},websocket_clients={}i,open_breakers={}i {}"
            ),
            self.health.status,
            requests.total_requests,
            requests.failed_requests,
            requests.in_flight,
            requests.average_duration_ms,
            requests.error_rate,
            self.gateway.websocket.connected_clients,
            open_breakers,
            ts
        );
        out
    }
}
