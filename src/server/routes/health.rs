//! Health and metrics endpoints

use crate::monitoring::{ExportFormat, MetricsSnapshot};
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Configure health and metrics routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(health_check))
            .route("/detailed", web::get().to(detailed_health_check)),
    )
    .route("/metrics", web::get().to(metrics));
}

/// Aggregate gateway health.
///
/// 200 only while the gateway is healthy, 503 otherwise, so load
/// balancers can act on the status code alone.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let report = state.monitor.get_health_status();
    debug!("Health check requested: {}", report.status);

    if report.is_healthy() {
        HttpResponse::Ok().json(report)
    } else {
        HttpResponse::ServiceUnavailable().json(report)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedHealth {
    version: &'static str,
    report: crate::monitoring::HealthReport,
    storage: StorageHealth,
    circuit_breakers: Vec<crate::core::circuit_breaker::BreakerStats>,
    requests: crate::core::tracker::TrackerStats,
    websocket: crate::core::broadcast::BroadcastStats,
    alerts: crate::monitoring::alerts::AlertStats,
}

#[derive(Debug, Serialize)]
struct StorageHealth {
    backend: &'static str,
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health report plus store, breaker, traffic and alert diagnostics
async fn detailed_health_check(state: web::Data<AppState>) -> HttpResponse {
    let storage = match state.storage.health_check().await {
        Ok(()) => StorageHealth {
            backend: state.storage.store().name(),
            healthy: true,
            error: None,
        },
        Err(e) => StorageHealth {
            backend: state.storage.store().name(),
            healthy: false,
            error: Some(e.to_string()),
        },
    };

    let detailed = DetailedHealth {
        version: crate::VERSION,
        report: state.monitor.get_health_status(),
        storage,
        circuit_breakers: state.breakers.get_all_stats(),
        requests: state.tracker.stats(),
        websocket: state.broadcaster.stats(),
        alerts: state.alerts.get_stats(),
    };

    ApiResponse::success(detailed).to_http_response()
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    #[serde(default)]
    pub format: Option<String>,
}

/// Metrics export in Prometheus text (default), JSON or Influx line protocol
async fn metrics(
    state: web::Data<AppState>,
    query: web::Query<MetricsQuery>,
) -> ActixResult<HttpResponse> {
    let format = match query.format.as_deref() {
        Some(raw) => ExportFormat::from_str(raw)?,
        None => ExportFormat::Prometheus,
    };

    let snapshot = MetricsSnapshot::new(
        state.monitor.get_health_status(),
        state.monitor.last_system_sample().unwrap_or_default(),
        state.tracker.stats(),
        state.broadcaster.stats(),
        state.breakers.get_all_stats(),
    );
    let body = snapshot.render(format)?;

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .body(body))
}
