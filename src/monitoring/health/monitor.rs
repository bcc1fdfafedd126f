//! Health monitor

use super::checks::{
    CustomCheck, HealthCheck, HttpCheck, MissingCheck, ProcessCheck, TcpCheck, check_with_timeout,
};
use super::types::{HealthCounts, HealthReport, MonitorEvent, ServiceHealthSummary};
use crate::config::MonitoringConfig;
use crate::core::registry::{
    CheckKind, HealthCheckResult, HealthStatus, ServiceDescriptor, ServiceRegistry,
};
use crate::core::tracker::RequestTracker;
use crate::monitoring::system::{ResourceKind, SystemSample, SystemSampler};
use crate::utils::error::{GatewayError, Result};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Requests needed before the gateway error rate is judged
const ERROR_RATE_MIN_REQUESTS: u64 = 20;

/// Polls registered services, folds the results into the registry and
/// raises edge-triggered alerts.
#[derive(Debug)]
pub struct HealthMonitor {
    pub(super) config: MonitoringConfig,
    pub(super) registry: Arc<ServiceRegistry>,
    http: HttpCheck,
    custom_checks: DashMap<String, Arc<dyn HealthCheck>>,
    history: DashMap<String, VecDeque<HealthCheckResult>>,
    /// Services currently past the alert threshold
    alerted: DashMap<String, ()>,
    events: broadcast::Sender<MonitorEvent>,
    sampler: SystemSampler,
    last_sample: RwLock<Option<SystemSample>>,
    breached: Mutex<HashSet<ResourceKind>>,
    tracker: Option<Arc<RequestTracker>>,
    pub(super) running: AtomicBool,
    pub(super) tasks: DashMap<String, JoinHandle<()>>,
    pub(super) background: Mutex<Vec<JoinHandle<()>>>,
    started_at: Instant,
}

impl HealthMonitor {
    pub fn new(config: MonitoringConfig, registry: Arc<ServiceRegistry>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            http: HttpCheck::new(client, config.thresholds.response_time_ms),
            config,
            registry,
            custom_checks: DashMap::new(),
            history: DashMap::new(),
            alerted: DashMap::new(),
            events,
            sampler: SystemSampler::new(),
            last_sample: RwLock::new(None),
            breached: Mutex::new(HashSet::new()),
            tracker: None,
            running: AtomicBool::new(false),
            tasks: DashMap::new(),
            background: Mutex::new(Vec::new()),
            started_at: Instant::now(),
        })
    }

    /// Judge the gateway error rate from this tracker's statistics
    pub fn with_tracker(mut self, tracker: Arc<RequestTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Use `check` for `service_id` in place of its configured check kind
    pub fn register_custom_check(&self, service_id: &str, check: Arc<dyn HealthCheck>) {
        info!(service = %service_id, "Custom health check registered");
        self.custom_checks.insert(service_id.to_string(), check);
    }

    /// Shorthand for registering a [`CustomCheck`] predicate
    pub fn register_predicate(&self, service_id: &str, check: CustomCheck) {
        self.register_custom_check(service_id, Arc::new(check));
    }

    fn check_for(&self, service: &ServiceDescriptor) -> Arc<dyn HealthCheck> {
        if let Some(check) = self.custom_checks.get(&service.id) {
            return Arc::clone(check.value());
        }
        match service.check_type {
            CheckKind::Http => Arc::new(self.http.clone()),
            CheckKind::Tcp => Arc::new(TcpCheck),
            CheckKind::Process => Arc::new(ProcessCheck),
            CheckKind::Custom => Arc::new(MissingCheck),
        }
    }

    /// Check one service.
    ///
    /// Up to `retries` attempts run with a linear backoff of
    /// `retry_delay_ms * attempt` between them, stopping at the first
    /// healthy answer. Exactly one outcome is written to the registry.
    pub async fn perform_health_check(&self, service_id: &str) -> Result<HealthCheckResult> {
        let service = self
            .registry
            .get_service(service_id)
            .ok_or_else(|| GatewayError::not_found(format!("service {}", service_id)))?;
        let check = self.check_for(&service);
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let attempts = self.config.retries.max(1);

        let mut result = check_with_timeout(check.as_ref(), &service, timeout).await;
        for attempt in 1..attempts {
            if result.status == HealthStatus::Healthy {
                break;
            }
            debug!(
                service = %service_id,
                "Attempt {}/{} failed: {}",
                attempt,
                attempts,
                result.error.as_deref().unwrap_or("unhealthy")
            );
            tokio::time::sleep(Duration::from_millis(
                self.config.retry_delay_ms * u64::from(attempt),
            ))
            .await;
            result = check_with_timeout(check.as_ref(), &service, timeout).await;
        }

        let record = self
            .registry
            .record_check(service_id, &result)
            .await
            .ok_or_else(|| GatewayError::not_found(format!("service {}", service_id)))?;

        self.push_history(service_id, &result);
        self.emit(MonitorEvent::CheckCompleted {
            service: service_id.to_string(),
            result: result.clone(),
        });

        let threshold = self.config.alert_threshold.max(1);
        if record.consecutive_failures == threshold {
            warn!(
                service = %service_id,
                "{} consecutive health check failures",
                record.consecutive_failures
            );
            self.alerted.insert(service_id.to_string(), ());
            self.emit(MonitorEvent::AlertTriggered {
                service: service_id.to_string(),
                critical: service.critical,
                consecutive_failures: record.consecutive_failures,
                error: result.error.clone(),
            });
        } else if record.consecutive_failures == 0 && self.alerted.remove(service_id).is_some() {
            info!(service = %service_id, "Service recovered");
            self.emit(MonitorEvent::ServiceRecovered {
                service: service_id.to_string(),
                critical: service.critical,
            });
        }

        Ok(result)
    }

    /// Check every registered service concurrently
    pub async fn check_all(&self) -> Vec<(String, Result<HealthCheckResult>)> {
        let ids = self.registry.ids();
        let checks = ids.iter().map(|id| self.perform_health_check(id));
        let results = futures::future::join_all(checks).await;
        ids.into_iter().zip(results).collect()
    }

    fn push_history(&self, service_id: &str, result: &HealthCheckResult) {
        let cutoff = result.timestamp
            - chrono::Duration::milliseconds(self.config.history_window_ms as i64);
        let mut history = self.history.entry(service_id.to_string()).or_default();
        history.push_back(result.clone());
        while history.front().is_some_and(|r| r.timestamp < cutoff) {
            history.pop_front();
        }
    }

    /// Results within the history window, oldest first
    pub fn get_history(&self, service_id: &str) -> Vec<HealthCheckResult> {
        let window = chrono::Duration::milliseconds(self.config.history_window_ms as i64);
        let cutoff = Utc::now() - window;
        self.history
            .get(service_id)
            .map(|history| {
                history
                    .iter()
                    .filter(|r| r.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop the history of a service that left the registry
    pub(super) fn forget(&self, service_id: &str) {
        self.history.remove(service_id);
        self.alerted.remove(service_id);
    }

    /// Sample host resources and the gateway error rate. Each resource
    /// raises one alert when it crosses its threshold and re-arms once it
    /// falls back below.
    pub fn check_system_resources(&self) -> SystemSample {
        let sample = self.sampler.sample();
        let thresholds = &self.config.thresholds;

        let mut current: Vec<(ResourceKind, f64, f64)> = sample.breaches(thresholds);
        if let Some(tracker) = &self.tracker {
            let stats = tracker.stats();
            if stats.total_requests >= ERROR_RATE_MIN_REQUESTS
                && stats.error_rate >= thresholds.error_rate
            {
                current.push((ResourceKind::ErrorRate, stats.error_rate, thresholds.error_rate));
            }
        }

        let fired: Vec<(ResourceKind, f64, f64)> = {
            let mut breached = self.breached.lock();
            let now: HashSet<ResourceKind> = current.iter().map(|(kind, _, _)| *kind).collect();
            let fired = current
                .into_iter()
                .filter(|(kind, _, _)| !breached.contains(kind))
                .collect();
            *breached = now;
            fired
        };

        for (kind, value, threshold) in fired {
            warn!("{}: {:.1} >= {:.1}", kind, value, threshold);
            self.emit(MonitorEvent::ResourceAlert {
                kind,
                value,
                threshold,
            });
        }

        *self.last_sample.write() = Some(sample.clone());
        sample
    }

    pub fn last_system_sample(&self) -> Option<SystemSample> {
        self.last_sample.read().clone()
    }

    /// Aggregate health, computed from the registry on every call.
    ///
    /// Unhealthy when any critical service is unhealthy, degraded when any
    /// other service is unhealthy or any service is degraded.
    pub fn get_health_status(&self) -> HealthReport {
        let services = self.registry.get_all_services();
        let mut summary = HealthCounts {
            total: services.len(),
            ..HealthCounts::default()
        };
        let mut status = HealthStatus::Healthy;

        for service in &services {
            match service.health {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Degraded => summary.degraded += 1,
                HealthStatus::Unhealthy => summary.unhealthy += 1,
                HealthStatus::Unknown => summary.unknown += 1,
            }
            status = match (service.health, service.critical) {
                (HealthStatus::Unhealthy, true) => HealthStatus::Unhealthy,
                (HealthStatus::Unhealthy, false) | (HealthStatus::Degraded, _)
                    if status == HealthStatus::Healthy =>
                {
                    HealthStatus::Degraded
                }
                _ => status,
            };
        }

        HealthReport {
            status,
            timestamp: Utc::now(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            summary,
            services: services
                .into_iter()
                .map(|service| ServiceHealthSummary {
                    id: service.id,
                    health: service.health,
                    critical: service.critical,
                    last_check: service.last_check,
                    consecutive_failures: service.consecutive_failures,
                    average_response_time: service.metrics.average_response_time,
                    uptime_percent: service.metrics.uptime_percent,
                    total_checks: service.metrics.total_checks,
                })
                .collect(),
            system: self.last_system_sample(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(super) fn log_check_error(service_id: &str, error: &GatewayError) {
        match error {
            GatewayError::NotFound(_) => {
                debug!(service = %service_id, "Service gone, skipping check")
            }
            other => error!(service = %service_id, "Health check task failed: {}", other),
        }
    }
}
