//! Configuration data models
//!
//! This module defines all configuration structures used throughout the gateway.

#![allow(missing_docs)]

pub mod auth;
pub mod breaker;
pub mod bridge;
pub mod discovery;
pub mod gateway;
pub mod monitoring;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod storage;

pub use auth::*;
pub use breaker::*;
pub use bridge::*;
pub use discovery::*;
pub use gateway::*;
pub use monitoring::*;
pub use rate_limit::*;
pub use routes::*;
pub use server::*;
pub use storage::*;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    3000
}

/// Default request timeout in seconds
pub fn default_timeout() -> u64 {
    30
}

pub fn default_true() -> bool {
    true
}

pub fn default_health_path() -> String {
    "/health".to_string()
}

pub fn default_gateway_group() -> String {
    "core".to_string()
}

/// Descriptor TTL in the persistent store (1 hour)
pub fn default_service_ttl() -> u64 {
    3600
}

/// Request trace TTL in the persistent store (5 minutes)
pub fn default_trace_ttl() -> u64 {
    300
}

/// Store call deadline on the request path (1 second)
pub fn default_store_op_timeout_ms() -> u64 {
    1000
}

pub fn default_breaker_timeout_ms() -> u64 {
    10_000
}

pub fn default_breaker_threshold() -> u32 {
    5
}

pub fn default_reset_timeout_ms() -> u64 {
    60_000
}

pub fn default_rolling_window_ms() -> u64 {
    60_000
}

pub fn default_volume_threshold() -> u32 {
    10
}

pub fn default_error_threshold() -> f64 {
    50.0
}

pub fn default_check_interval_ms() -> u64 {
    30_000
}

pub fn default_check_timeout_ms() -> u64 {
    5_000
}

pub fn default_check_retries() -> u32 {
    3
}

pub fn default_retry_delay_ms() -> u64 {
    1_000
}

pub fn default_alert_threshold() -> u32 {
    3
}

pub fn default_history_window_ms() -> u64 {
    5 * 60 * 1000
}

pub fn default_system_interval_ms() -> u64 {
    60_000
}

pub fn default_rate_limit_window_ms() -> u64 {
    15 * 60 * 1000
}

pub fn default_rate_limit_max() -> u64 {
    1000
}

pub fn default_discovery_timeout_ms() -> u64 {
    3_000
}

pub fn default_jwt_issuer() -> String {
    "telegate".to_string()
}

pub fn default_jwt_expiration() -> u64 {
    86400 // 24 hours
}

pub fn default_update_channel() -> String {
    "tdlib:updates".to_string()
}
