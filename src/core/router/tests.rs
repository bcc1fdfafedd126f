//! Router tests

use super::*;
use crate::config::{BreakerConfig, RouteConfig};
use crate::core::circuit_breaker::{CircuitBreakerManager, CircuitState};
use crate::utils::error::GatewayError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(path: &str) -> ProxyRequest {
    ProxyRequest {
        request_id: "req-1".to_string(),
        method: "GET".to_string(),
        path: path.to_string(),
        client_ip: "10.1.2.3".to_string(),
        ..ProxyRequest::default()
    }
}

fn router(routes: Vec<RouteConfig>, threshold: u32) -> RequestRouter {
    let breakers = Arc::new(CircuitBreakerManager::new(BreakerConfig {
        threshold,
        ..BreakerConfig::default()
    }));
    RequestRouter::new(&routes, breakers, Duration::from_secs(2)).unwrap()
}

// ==================== Table Tests ====================

#[test]
fn test_longest_prefix_wins() {
    let table = RouteTable::from_config(&[
        RouteConfig::new("api", "/api", "http://localhost:1", false),
        RouteConfig::new("auth", "/api/auth", "http://localhost:2", false),
    ])
    .unwrap();

    assert_eq!(table.resolve("/api/auth/login").unwrap().name, "auth");
    assert_eq!(table.resolve("/api/bot").unwrap().name, "api");
    assert_eq!(table.resolve("/api").unwrap().name, "api");
    assert!(table.resolve("/apix").is_none());
    assert!(table.resolve("/other").is_none());
}

#[test]
fn test_target_url() {
    let table = RouteTable::from_config(&[
        RouteConfig::new("core", "/core/", "http://localhost:3001", true),
        RouteConfig::new("bot", "/api/bot", "http://localhost:3001/", false),
    ])
    .unwrap();

    let core = table.get("core").unwrap();
    assert_eq!(
        core.target_url("/core/users", Some("page=2")),
        "http://localhost:3001/users?page=2"
    );
    assert_eq!(core.target_url("/core", None), "http://localhost:3001/");

    let bot = table.get("bot").unwrap();
    assert_eq!(
        bot.target_url("/api/bot/send", Some("")),
        "http://localhost:3001/api/bot/send"
    );
}

#[test]
fn test_invalid_upstream_is_config_error() {
    let result = RouteTable::from_config(&[RouteConfig::new("x", "/x", "nope", false)]);
    assert!(matches!(result, Err(GatewayError::Config(_))));
}

#[test]
fn test_hop_by_hop() {
    assert!(is_hop_by_hop("Connection"));
    assert!(is_hop_by_hop("transfer-encoding"));
    assert!(!is_hop_by_hop("authorization"));
}

// ==================== Proxy Tests ====================

#[tokio::test]
async fn test_forwards_with_gateway_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(header("x-request-id", "req-1"))
        .and(header("x-forwarded-for", "10.1.2.3"))
        .and(header("authorization", "Bearer t"))
        .and(header_exists("x-gateway-timestamp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let router = router(vec![RouteConfig::new("core", "/core", &server.uri(), true)], 5);
    let mut req = request("/core/users");
    req.headers = vec![
        ("authorization".to_string(), b"Bearer t".to_vec()),
        ("connection".to_string(), b"keep-alive".to_vec()),
        ("x-request-id".to_string(), b"spoofed".to_vec()),
    ];

    match router.route(req).await {
        ProxyOutcome::Forwarded(response) => {
            assert_eq!(response.status(), 200);
            assert_eq!(response.text().await.unwrap(), "ok");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_upstream_500_is_not_a_breaker_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let router = router(vec![RouteConfig::new("auth", "/api/auth", &server.uri(), false)], 1);
    for _ in 0..3 {
        match router.route(request("/api/auth/login")).await {
            ProxyOutcome::Forwarded(response) => assert_eq!(response.status(), 500),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    let stats = router.breakers().get_stats("auth").unwrap();
    assert_eq!(stats.failure_count, 0);
    assert_eq!(stats.state, CircuitState::Closed);
}

#[tokio::test]
async fn test_connection_refused_is_a_breaker_failure() {
    let router = router(
        vec![RouteConfig::new("auth", "/api/auth", "http://127.0.0.1:1", false)],
        2,
    );

    let outcome = router.route(request("/api/auth/login")).await;
    assert!(matches!(
        outcome,
        ProxyOutcome::TransportError {
            error: GatewayError::UpstreamTransport(_),
            ..
        }
    ));
    assert_eq!(router.breakers().get_stats("auth").unwrap().failure_count, 1);

    router.route(request("/api/auth/login")).await;
    match router.route(request("/api/auth/login")).await {
        ProxyOutcome::CircuitOpen {
            route,
            next_attempt,
        } => {
            assert_eq!(route, "auth");
            assert_eq!(Some(next_attempt), router.breakers().next_attempt("auth"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_shared_breaker_name() {
    let router = router(
        vec![
            RouteConfig::new("user", "/user", "http://127.0.0.1:1", true).with_breaker("auth"),
            RouteConfig::new("auth", "/api/auth", "http://127.0.0.1:1", false),
        ],
        1,
    );
    router.route(request("/user/me")).await;
    assert!(matches!(
        router.route(request("/api/auth/login")).await,
        ProxyOutcome::CircuitOpen { .. }
    ));
}

#[tokio::test]
async fn test_unknown_path_and_bad_method() {
    let router = router(vec![RouteConfig::new("core", "/core", "http://127.0.0.1:1", true)], 5);
    assert!(matches!(router.route(request("/nope")).await, ProxyOutcome::NoRoute));

    let mut req = request("/core/x");
    req.method = "BAD METHOD".to_string();
    assert!(matches!(
        router.route(req).await,
        ProxyOutcome::Rejected(GatewayError::BadRequest(_))
    ));
}

#[derive(Default)]
struct CountingHooks {
    before: AtomicU32,
    after: AtomicU32,
    errors: AtomicU32,
}

impl ProxyHooks for CountingHooks {
    fn before_forward(&self, _ctx: &ForwardContext, headers: &mut reqwest::header::HeaderMap) {
        self.before.fetch_add(1, Ordering::SeqCst);
        headers.insert("x-hooked", reqwest::header::HeaderValue::from_static("1"));
    }

    fn after_forward(&self, _ctx: &ForwardContext, _status: u16) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }

    fn on_transport_error(&self, _ctx: &ForwardContext, _error: &GatewayError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_hooks_run_in_lifecycle_order() {
    let server = MockServer::start().await;
    Mock::given(header("x-hooked", "1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let hooks = Arc::new(CountingHooks::default());
    let router = router(
        vec![
            RouteConfig::new("live", "/live", &server.uri(), true),
            RouteConfig::new("dead", "/dead", "http://127.0.0.1:1", true),
        ],
        5,
    )
    .with_hook(hooks.clone());

    router.route(request("/live/x")).await;
    router.route(request("/dead/x")).await;

    assert_eq!(hooks.before.load(Ordering::SeqCst), 2);
    assert_eq!(hooks.after.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.errors.load(Ordering::SeqCst), 1);
}
