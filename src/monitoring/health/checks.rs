//! Check strategies
//!
//! Every strategy answers the same question for one descriptor and never
//! fails: problems are folded into an unhealthy result.

use crate::core::registry::{CheckKind, HealthCheckResult, HealthStatus, ServiceDescriptor};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// One way of probing a service
#[async_trait]
pub trait HealthCheck: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> CheckKind;

    async fn check(&self, service: &ServiceDescriptor) -> HealthCheckResult;
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Interpret a health endpoint answer.
///
/// Healthy requires a 2xx status and either no `status` field in the body
/// or `status == "healthy"`. A body reporting `degraded` is degraded;
/// anything else is unhealthy.
pub fn classify_http(status: u16, body: &str) -> (HealthStatus, Option<String>) {
    if !(200..300).contains(&status) {
        return (HealthStatus::Unhealthy, Some(format!("health endpoint answered {}", status)));
    }

    let reported = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("status").cloned());
    match reported {
        None => (HealthStatus::Healthy, None),
        Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("healthy") => {
            (HealthStatus::Healthy, None)
        }
        Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("degraded") => {
            (HealthStatus::Degraded, Some("service reports degraded".to_string()))
        }
        Some(other) => (
            HealthStatus::Unhealthy,
            Some(format!("service reports status {}", other)),
        ),
    }
}

/// `GET <endpoint><health_endpoint>`
#[derive(Debug, Clone)]
pub struct HttpCheck {
    client: reqwest::Client,
    slow_threshold_ms: u64,
}

impl HttpCheck {
    pub fn new(client: reqwest::Client, slow_threshold_ms: u64) -> Self {
        Self {
            client,
            slow_threshold_ms,
        }
    }
}

#[async_trait]
impl HealthCheck for HttpCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Http
    }

    async fn check(&self, service: &ServiceDescriptor) -> HealthCheckResult {
        let started = Instant::now();
        let url = service.health_url();

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(service = %service.id, "Health request failed: {}", e);
                return HealthCheckResult::unhealthy(elapsed_ms(started), e.to_string());
            }
        };
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let response_time = elapsed_ms(started);

        let (mut health, error) = classify_http(status, &body);
        if health == HealthStatus::Healthy && response_time > self.slow_threshold_ms {
            health = HealthStatus::Degraded;
        }

        match error {
            Some(error) => HealthCheckResult::unhealthy(response_time, error).with_status(health),
            None => HealthCheckResult::healthy(response_time).with_status(health),
        }
    }
}

/// Raw TCP connect to the endpoint's host and port
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpCheck;

#[async_trait]
impl HealthCheck for TcpCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Tcp
    }

    async fn check(&self, service: &ServiceDescriptor) -> HealthCheckResult {
        let started = Instant::now();
        let target = url::Url::parse(&service.endpoint).ok().and_then(|url| {
            let host = url.host_str()?.to_string();
            let port = url.port_or_known_default()?;
            Some((host, port))
        });
        let Some((host, port)) = target else {
            return HealthCheckResult::unhealthy(0, format!("no host:port in {}", service.endpoint));
        };

        match tokio::net::TcpStream::connect((host.as_str(), port)).await {
            Ok(_) => HealthCheckResult::healthy(elapsed_ms(started)),
            Err(e) => HealthCheckResult::unhealthy(
                elapsed_ms(started),
                format!("connect {}:{} failed: {}", host, port, e),
            ),
        }
    }
}

/// Looks for a running process named after the service
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCheck;

#[async_trait]
impl HealthCheck for ProcessCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Process
    }

    async fn check(&self, service: &ServiceDescriptor) -> HealthCheckResult {
        let started = Instant::now();
        let name = service.process_name().to_string();
        let target = name.clone();

        match tokio::task::spawn_blocking(move || process_running(&target)).await {
            Ok(Ok(true)) => HealthCheckResult::healthy(elapsed_ms(started)),
            Ok(Ok(false)) => HealthCheckResult::unhealthy(
                elapsed_ms(started),
                format!("process {} not running", name),
            ),
            Ok(Err(e)) => HealthCheckResult::unhealthy(elapsed_ms(started), e),
            Err(e) => HealthCheckResult::unhealthy(elapsed_ms(started), e.to_string()),
        }
    }
}

#[cfg(feature = "metrics")]
fn process_running(name: &str) -> std::result::Result<bool, String> {
    use sysinfo::{ProcessRefreshKind, RefreshKind, System};

    let system =
        System::new_with_specifics(RefreshKind::new().with_processes(ProcessRefreshKind::new()));
    Ok(system
        .processes()
        .values()
        .any(|process| process.name().to_string_lossy().contains(name)))
}

#[cfg(not(feature = "metrics"))]
fn process_running(_name: &str) -> std::result::Result<bool, String> {
    Err("process checks need the metrics feature".to_string())
}

type Predicate = Arc<dyn Fn(ServiceDescriptor) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Caller-supplied predicate
#[derive(Clone)]
pub struct CustomCheck {
    predicate: Predicate,
}

impl CustomCheck {
    pub fn new<F, Fut>(predicate: F) -> Self
    where
        F: Fn(ServiceDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        Self {
            predicate: Arc::new(move |service| Box::pin(predicate(service))),
        }
    }
}

impl std::fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomCheck").finish_non_exhaustive()
    }
}

#[async_trait]
impl HealthCheck for CustomCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Custom
    }

    async fn check(&self, service: &ServiceDescriptor) -> HealthCheckResult {
        let started = Instant::now();
        match (self.predicate)(service.clone()).await {
            Ok(true) => HealthCheckResult::healthy(elapsed_ms(started)),
            Ok(false) => HealthCheckResult::unhealthy(elapsed_ms(started), "custom check failed"),
            Err(e) => HealthCheckResult::unhealthy(elapsed_ms(started), e.to_string()),
        }
    }
}

/// Stand-in for a custom service nobody registered a predicate for
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct MissingCheck;

#[async_trait]
impl HealthCheck for MissingCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Custom
    }

    async fn check(&self, service: &ServiceDescriptor) -> HealthCheckResult {
        HealthCheckResult::unhealthy(0, format!("no custom check registered for {}", service.id))
    }
}

/// Run a check under a deadline; overrunning counts as unhealthy
pub async fn check_with_timeout(
    check: &dyn HealthCheck,
    service: &ServiceDescriptor,
    timeout: Duration,
) -> HealthCheckResult {
    match tokio::time::timeout(timeout, check.check(service)).await {
        Ok(result) => result,
        Err(_) => HealthCheckResult::unhealthy(
            timeout.as_millis() as u64,
            format!("health check timed out after {}ms", timeout.as_millis()),
        ),
    }
}
