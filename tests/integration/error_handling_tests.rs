//! Error envelopes as clients see them

#[cfg(test)]
mod tests {
    use crate::common::{app_state, assert_error_code, gateway_config, refused_endpoint};
    use actix_web::http::StatusCode;
    use actix_web::{test, web};
    use serde_json::Value;
    use telegate::config::{RateLimitConfig, RouteConfig};
    use telegate::server::HttpServer;

    fn routed_config() -> telegate::config::GatewayConfig {
        let mut gateway = gateway_config();
        gateway.routes = vec![RouteConfig::new("core", "/core", &refused_endpoint(), true)];
        gateway
    }

    // ==================== Envelope Tests ====================

    #[actix_web::test]
    async fn test_unknown_path_uses_error_envelope() {
        let state = app_state(gateway_config()).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/nowhere").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().contains_key("x-request-id"));

        let body: Value = test::read_body_json(resp).await;
        assert_error_code(&body, "NOT_FOUND");
        assert!(body["error"]["timestamp"].as_i64().unwrap() > 0);
        assert!(body["error"].get("retryAfter").is_none());
    }

    #[actix_web::test]
    async fn test_malformed_registration_body_is_bad_request() {
        let state = app_state(gateway_config()).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::post()
            .uri("/services")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"id\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_error_code(&body, "BAD_REQUEST");
    }

    #[actix_web::test]
    async fn test_unknown_breaker_action_is_rejected() {
        let state = app_state(routed_config()).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::post()
            .uri("/circuit-breakers/core/explode")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/circuit-breakers/ghost/open")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_rate_limited_client_gets_retry_hint() {
        let mut gateway = gateway_config();
        gateway.rate_limit = RateLimitConfig {
            enabled: true,
            window_ms: 60_000,
            max_requests: 1,
        };
        let state = app_state(gateway).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/services").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let before = chrono::Utc::now().timestamp_millis();
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/services").to_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("retry-after"));

        let body: Value = test::read_body_json(resp).await;
        assert_error_code(&body, "RATE_LIMIT_EXCEEDED");
        assert!(body["error"]["retryAfter"].as_i64().unwrap() >= before + 60_000);
    }

    // ==================== Upstream Failure Tests ====================

    #[actix_web::test]
    async fn test_refused_upstream_is_bad_gateway() {
        let state = app_state(routed_config()).await;
        let tracker = state.tracker.clone();
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/core/ping").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap();

        let body: Value = test::read_body_json(resp).await;
        assert_error_code(&body, "UPSTREAM_UNREACHABLE");
        assert_eq!(body["error"]["request_id"], request_id.as_str());

        let trace = tracker.get_trace(&request_id).await.unwrap();
        assert_eq!(trace.status_code, Some(502));
        assert_eq!(trace.path, "/core/ping");
        assert_eq!(tracker.stats().failed_requests, 1);
    }

    #[actix_web::test]
    async fn test_forced_open_breaker_fails_fast_with_retry_hint() {
        let state = app_state(routed_config()).await;
        let stats = state.breakers.force_open("core").unwrap();
        let next_attempt = state.breakers.next_attempt("core").unwrap();
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        assert_eq!(serde_json::to_value(&stats).unwrap()["state"], "OPEN");

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/core/ping").to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let retry_after: i64 = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap();
        assert!(retry_after >= 1);

        let body: Value = test::read_body_json(resp).await;
        assert_error_code(&body, "CIRCUIT_BREAKER_OPEN");
        assert_eq!(body["error"]["retryAfter"], next_attempt);
    }
}
