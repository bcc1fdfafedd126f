//! Configuration and state fixtures

use telegate::config::{Config, GatewayConfig, MonitoringConfig, RateLimitConfig};
use telegate::server::AppState;
use telegate::storage::StorageLayer;

/// Gateway configuration with no routes, no seed services and no rate
/// limiting; monitoring tuned for fast single-attempt checks
pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        routes: Vec::new(),
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        monitoring: MonitoringConfig {
            retries: 1,
            retry_delay_ms: 10,
            timeout_ms: 1_000,
            ..MonitoringConfig::default()
        },
        ..GatewayConfig::default()
    }
}

/// Application state on an in-memory store
pub async fn app_state(gateway: GatewayConfig) -> AppState {
    app_state_on(gateway, StorageLayer::in_memory()).await
}

/// Application state on a caller-provided store
pub async fn app_state_on(gateway: GatewayConfig, storage: StorageLayer) -> AppState {
    AppState::with_storage(Config { gateway }, storage)
        .await
        .expect("app state")
}

/// A local address nothing listens on, so connects are refused
pub fn refused_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
