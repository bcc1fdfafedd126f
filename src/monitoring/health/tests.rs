use super::*;
use crate::config::{DiscoveryConfig, MonitoringConfig, ThresholdConfig};
use crate::core::registry::{CheckKind, HealthStatus, ServiceRegistration, ServiceRegistry};
use crate::monitoring::system::ResourceKind;
use crate::storage::StorageLayer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> MonitoringConfig {
    MonitoringConfig {
        retries: 1,
        retry_delay_ms: 10,
        timeout_ms: 500,
        alert_threshold: 3,
        ..MonitoringConfig::default()
    }
}

fn registry() -> Arc<ServiceRegistry> {
    Arc::new(ServiceRegistry::new(
        StorageLayer::in_memory(),
        DiscoveryConfig::default(),
    ))
}

async fn monitor_with(
    config: MonitoringConfig,
    registrations: Vec<ServiceRegistration>,
) -> Arc<HealthMonitor> {
    let registry = registry();
    for registration in registrations {
        registry.register_service(registration).await.unwrap();
    }
    Arc::new(HealthMonitor::new(config, registry).unwrap())
}

fn custom(id: &str) -> ServiceRegistration {
    ServiceRegistration::new(id, "http://127.0.0.1:1").check(CheckKind::Custom)
}

/// Predicate whose answer is flipped by the returned flag, counting calls
fn toggled(healthy: bool) -> (CustomCheck, Arc<AtomicBool>, Arc<AtomicU32>) {
    let flag = Arc::new(AtomicBool::new(healthy));
    let calls = Arc::new(AtomicU32::new(0));
    let (f, c) = (Arc::clone(&flag), Arc::clone(&calls));
    let check = CustomCheck::new(move |_| {
        let (f, c) = (Arc::clone(&f), Arc::clone(&c));
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(f.load(Ordering::SeqCst))
        }
    });
    (check, flag, calls)
}

fn drain(rx: &mut Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn alerts(events: &[MonitorEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, MonitorEvent::AlertTriggered { .. }))
        .count()
}

// ==================== Classification Tests ====================

#[test]
fn test_classify_http() {
    assert_eq!(classify_http(200, "").0, HealthStatus::Healthy);
    assert_eq!(classify_http(204, "not json").0, HealthStatus::Healthy);
    assert_eq!(classify_http(200, r#"{"uptime": 5}"#).0, HealthStatus::Healthy);
    assert_eq!(classify_http(200, r#"{"status":"healthy"}"#).0, HealthStatus::Healthy);
    assert_eq!(classify_http(200, r#"{"status":"degraded"}"#).0, HealthStatus::Degraded);
    assert_eq!(classify_http(200, r#"{"status":"error"}"#).0, HealthStatus::Unhealthy);
    assert_eq!(classify_http(503, r#"{"status":"healthy"}"#).0, HealthStatus::Unhealthy);
    assert_eq!(classify_http(301, "").0, HealthStatus::Unhealthy);
}

// ==================== Strategy Tests ====================

#[tokio::test]
async fn test_http_check_against_health_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "healthy"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "down"})),
        )
        .mount(&server)
        .await;

    let mut down = ServiceRegistration::new("media", server.uri());
    down.health_endpoint = "/status".to_string();
    let monitor = monitor_with(
        test_config(),
        vec![ServiceRegistration::new("bot", server.uri()), down],
    )
    .await;

    let result = monitor.perform_health_check("bot").await.unwrap();
    assert_eq!(result.status, HealthStatus::Healthy);
    assert_eq!(monitor.registry().get_service("bot").unwrap().health, HealthStatus::Healthy);

    let result = monitor.perform_health_check("media").await.unwrap();
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(result.error.unwrap().contains("down"));
}

#[tokio::test]
async fn test_slow_http_service_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(120)))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.thresholds.response_time_ms = 50;
    let monitor = monitor_with(config, vec![ServiceRegistration::new("slow", server.uri())]).await;

    let result = monitor.perform_health_check("slow").await.unwrap();
    assert_eq!(result.status, HealthStatus::Degraded);
}

#[tokio::test]
async fn test_tcp_check() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = format!("http://{}", listener.local_addr().unwrap());

    let monitor = monitor_with(
        test_config(),
        vec![
            ServiceRegistration::new("open", open).check(CheckKind::Tcp),
            ServiceRegistration::new("closed", "http://127.0.0.1:1").check(CheckKind::Tcp),
        ],
    )
    .await;

    assert_eq!(
        monitor.perform_health_check("open").await.unwrap().status,
        HealthStatus::Healthy
    );
    assert_eq!(
        monitor.perform_health_check("closed").await.unwrap().status,
        HealthStatus::Unhealthy
    );
}

#[tokio::test]
async fn test_custom_kind_without_predicate_is_unhealthy() {
    let monitor = monitor_with(test_config(), vec![custom("lonely")]).await;
    let result = monitor.perform_health_check("lonely").await.unwrap();
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(result.error.unwrap().contains("no custom check"));
}

#[tokio::test]
async fn test_check_timeout_counts_as_failure() {
    let mut config = test_config();
    config.timeout_ms = 50;
    let monitor = monitor_with(config, vec![custom("stuck")]).await;
    monitor.register_predicate(
        "stuck",
        CustomCheck::new(|_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(true)
        }),
    );

    let result = monitor.perform_health_check("stuck").await.unwrap();
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(result.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_unknown_service_is_not_found() {
    let monitor = monitor_with(test_config(), vec![]).await;
    assert!(monitor.perform_health_check("ghost").await.is_err());
}

// ==================== Retry Tests ====================

#[tokio::test]
async fn test_retries_record_exactly_one_outcome() {
    let mut config = test_config();
    config.retries = 3;
    let monitor = monitor_with(config, vec![custom("flaky")]).await;
    let (check, _flag, calls) = toggled(false);
    monitor.register_predicate("flaky", check);

    let result = monitor.perform_health_check("flaky").await.unwrap();
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let service = monitor.registry().get_service("flaky").unwrap();
    assert_eq!(service.metrics.total_checks, 1);
    assert_eq!(service.consecutive_failures, 1);
}

#[tokio::test]
async fn test_retries_stop_at_first_healthy_answer() {
    let mut config = test_config();
    config.retries = 5;
    let monitor = monitor_with(config, vec![custom("fine")]).await;
    let (check, _flag, calls) = toggled(true);
    monitor.register_predicate("fine", check);

    let result = monitor.perform_health_check("fine").await.unwrap();
    assert_eq!(result.status, HealthStatus::Healthy);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ==================== Alert Tests ====================

#[tokio::test]
async fn test_alert_fires_once_per_crossing() {
    let monitor = monitor_with(test_config(), vec![custom("auth").critical(true)]).await;
    let (check, flag, _calls) = toggled(false);
    monitor.register_predicate("auth", check);
    let mut rx = monitor.subscribe();

    for _ in 0..2 {
        monitor.perform_health_check("auth").await.unwrap();
    }
    assert_eq!(alerts(&drain(&mut rx)), 0);

    monitor.perform_health_check("auth").await.unwrap();
    let events = drain(&mut rx);
    assert_eq!(alerts(&events), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        MonitorEvent::AlertTriggered {
            service,
            critical: true,
            consecutive_failures: 3,
            ..
        } if service == "auth"
    )));

    for _ in 0..3 {
        monitor.perform_health_check("auth").await.unwrap();
    }
    assert_eq!(alerts(&drain(&mut rx)), 0);

    flag.store(true, Ordering::SeqCst);
    monitor.perform_health_check("auth").await.unwrap();
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        MonitorEvent::ServiceRecovered { service, .. } if service == "auth"
    )));

    // Re-armed after recovery
    flag.store(false, Ordering::SeqCst);
    for _ in 0..3 {
        monitor.perform_health_check("auth").await.unwrap();
    }
    assert_eq!(alerts(&drain(&mut rx)), 1);
}

#[tokio::test]
async fn test_no_recovery_event_without_prior_alert() {
    let monitor = monitor_with(test_config(), vec![custom("blip")]).await;
    let (check, flag, _calls) = toggled(false);
    monitor.register_predicate("blip", check);
    let mut rx = monitor.subscribe();

    monitor.perform_health_check("blip").await.unwrap();
    flag.store(true, Ordering::SeqCst);
    monitor.perform_health_check("blip").await.unwrap();

    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, MonitorEvent::ServiceRecovered { .. })));
}

#[tokio::test]
async fn test_resource_alerts_are_edge_triggered() {
    let mut config = test_config();
    config.thresholds = ThresholdConfig {
        cpu: 0.0,
        memory: 0.0,
        disk: 0.0,
        ..ThresholdConfig::default()
    };
    let monitor = monitor_with(config, vec![]).await;
    let mut rx = monitor.subscribe();

    monitor.check_system_resources();
    let kinds: Vec<ResourceKind> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            MonitorEvent::ResourceAlert { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![ResourceKind::Cpu, ResourceKind::Memory, ResourceKind::Disk]);

    monitor.check_system_resources();
    assert!(drain(&mut rx).is_empty());
    assert!(monitor.last_system_sample().is_some());
}

// ==================== History Tests ====================

#[tokio::test]
async fn test_history_keeps_recent_results() {
    let monitor = monitor_with(test_config(), vec![custom("hist")]).await;
    let (check, _flag, _calls) = toggled(true);
    monitor.register_predicate("hist", check);

    for _ in 0..3 {
        monitor.perform_health_check("hist").await.unwrap();
    }
    assert_eq!(monitor.get_history("hist").len(), 3);
    assert!(monitor.get_history("other").is_empty());
}

#[tokio::test]
async fn test_history_window_trims_old_results() {
    let mut config = test_config();
    config.history_window_ms = 30;
    let monitor = monitor_with(config, vec![custom("hist")]).await;
    let (check, _flag, _calls) = toggled(true);
    monitor.register_predicate("hist", check);

    monitor.perform_health_check("hist").await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    monitor.perform_health_check("hist").await.unwrap();
    assert_eq!(monitor.get_history("hist").len(), 1);
}

// ==================== Aggregate Tests ====================

#[tokio::test]
async fn test_aggregate_health() {
    let monitor = monitor_with(
        test_config(),
        vec![custom("auth").critical(true), custom("media"), custom("bot")],
    )
    .await;
    let registry = monitor.registry();
    for id in ["auth", "media", "bot"] {
        registry.update_service_health(id, HealthStatus::Healthy, None).await;
    }
    assert_eq!(monitor.get_health_status().status, HealthStatus::Healthy);

    registry.update_service_health("media", HealthStatus::Unhealthy, None).await;
    let report = monitor.get_health_status();
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.summary.unhealthy, 1);

    registry.update_service_health("auth", HealthStatus::Unhealthy, None).await;
    assert_eq!(monitor.get_health_status().status, HealthStatus::Unhealthy);

    registry.update_service_health("media", HealthStatus::Healthy, None).await;
    assert_eq!(monitor.get_health_status().status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_degraded_critical_service_degrades_gateway() {
    let monitor = monitor_with(test_config(), vec![custom("auth").critical(true)]).await;
    monitor
        .registry()
        .update_service_health("auth", HealthStatus::Degraded, None)
        .await;
    assert_eq!(monitor.get_health_status().status, HealthStatus::Degraded);
}

// ==================== Lifecycle Tests ====================

#[tokio::test]
async fn test_start_checks_existing_and_new_services() {
    let mut config = test_config();
    config.interval_ms = 40;
    let monitor = monitor_with(config, vec![custom("early")]).await;
    let (early, _f1, early_calls) = toggled(true);
    let (late, _f2, late_calls) = toggled(true);
    monitor.register_predicate("early", early);
    monitor.register_predicate("late", late);

    monitor.start();
    assert!(monitor.is_running());
    monitor.registry().register_service(custom("late")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    monitor.stop();
    assert!(!monitor.is_running());

    assert!(early_calls.load(Ordering::SeqCst) >= 1);
    assert!(late_calls.load(Ordering::SeqCst) >= 1);

    let after_stop = early_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(early_calls.load(Ordering::SeqCst), after_stop);
}
