//! Monitor, alerting, breaker and proxy working together

#[cfg(test)]
mod tests {
    use crate::common::{app_state, assert_error_code, gateway_config, refused_endpoint, wait_until};
    use actix_web::http::StatusCode;
    use actix_web::{test, web};
    use serde_json::Value;
    use std::time::Duration;
    use telegate::config::{BreakerConfig, RouteConfig};
    use telegate::core::circuit_breaker::CircuitState;
    use telegate::core::registry::{HealthStatus, ServiceRegistration};
    use telegate::monitoring::{AlertSeverity, MonitorEvent};
    use telegate::server::HttpServer;

    /// A critical `auth` service refusing connections raises exactly one
    /// alert at the third failed check, its breaker opens after the fifth
    /// refused proxy call, and clients then get 503 with the breaker's
    /// next attempt time.
    #[actix_web::test]
    async fn test_refused_critical_service_end_to_end() {
        let endpoint = refused_endpoint();

        let mut gateway = gateway_config();
        gateway.monitoring.alert_threshold = 3;
        gateway.circuit_breaker = BreakerConfig {
            threshold: 5,
            ..BreakerConfig::default()
        };
        gateway.routes = vec![RouteConfig::new("auth", "/api/auth", &endpoint, false)];
        gateway.services = vec![ServiceRegistration::new("auth", endpoint.as_str()).critical(true)];

        let state = app_state(gateway).await;
        let mut events = state.monitor.subscribe();
        let alert_task = state.alerts.spawn(state.monitor.subscribe());
        let app = test::init_service(HttpServer::create_app(web::Data::new(state.clone()))).await;

        let mut alerts_after_check = Vec::new();
        for _ in 0..5 {
            let result = state.monitor.perform_health_check("auth").await.unwrap();
            assert_eq!(result.status, HealthStatus::Unhealthy);

            let mut triggered = 0;
            while let Ok(event) = events.try_recv() {
                if let MonitorEvent::AlertTriggered {
                    service,
                    critical,
                    consecutive_failures,
                    ..
                } = event
                {
                    assert_eq!(service, "auth");
                    assert!(critical);
                    assert_eq!(consecutive_failures, 3);
                    triggered += 1;
                }
            }
            alerts_after_check.push(triggered);

            let resp = test::call_service(
                &app,
                test::TestRequest::get().uri("/api/auth/login").to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        }

        // Exactly one alert, raised by the third failure
        assert_eq!(alerts_after_check, vec![0, 0, 1, 0, 0]);
        let descriptor = state.registry.get_service("auth").unwrap();
        assert_eq!(descriptor.consecutive_failures, 5);
        assert_eq!(descriptor.metrics.total_checks, 5);

        let alerts = state.alerts.clone();
        assert!(
            wait_until(Duration::from_secs(2), || {
                let alerts = alerts.clone();
                async move { alerts.get_stats().total_alerts == 1 }
            })
            .await
        );
        let history = state.alerts.get_history(None);
        assert_eq!(history[0].kind, "service_down");
        assert_eq!(history[0].severity, AlertSeverity::Critical);

        // Breaker opened by the fifth refused call
        let stats = state.breakers.get_stats("auth").unwrap();
        assert_eq!(stats.state, CircuitState::Open);
        let next_attempt = stats.next_attempt.unwrap();

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/auth/login").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        assert_error_code(&body, "CIRCUIT_BREAKER_OPEN");
        assert_eq!(body["error"]["retryAfter"].as_i64(), Some(next_attempt));

        // Aggregate health follows the critical service
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        alert_task.abort();
    }

    /// A recovering service emits one recovery alert and re-arms
    #[actix_web::test]
    async fn test_recovery_after_alert() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let upstream = MockServer::start().await;
        let mut gateway = gateway_config();
        gateway.monitoring.alert_threshold = 1;
        gateway.services = vec![ServiceRegistration::new("media", upstream.uri()).critical(false)];

        let state = app_state(gateway).await;
        let alert_task = state.alerts.spawn(state.monitor.subscribe());

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "healthy"})),
            )
            .mount(&upstream)
            .await;

        let first = state.monitor.perform_health_check("media").await.unwrap();
        assert_eq!(first.status, HealthStatus::Unhealthy);
        let second = state.monitor.perform_health_check("media").await.unwrap();
        assert_eq!(second.status, HealthStatus::Healthy);

        let alerts = state.alerts.clone();
        assert!(
            wait_until(Duration::from_secs(2), || {
                let alerts = alerts.clone();
                async move { alerts.get_stats().total_alerts == 2 }
            })
            .await
        );
        let kinds: Vec<String> = state
            .alerts
            .get_history(None)
            .into_iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(kinds, vec!["service_recovered", "service_down"]);

        assert_eq!(
            state.registry.get_service("media").unwrap().health,
            HealthStatus::Healthy
        );
        alert_task.abort();
    }
}
