//! Error types for the gateway

use thiserror::Error;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Persistent store errors that are not Redis protocol errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Client exceeded its request window; `retry_at` is unix epoch
    /// milliseconds
    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String, retry_at: i64 },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Breaker for `name` is open; calls are rejected until `next_attempt`
    /// (unix epoch milliseconds)
    #[error("Circuit breaker '{name}' is open until {next_attempt}")]
    CircuitOpen { name: String, next_attempt: i64 },

    /// Connection refused/reset/timeout while talking to an upstream
    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    /// A health check failed
    #[error("Health check failed: {0}")]
    HealthCheck(String),

    /// One or more declared dependencies are not healthy
    #[error("Dependency unhealthy: {0}")]
    DependencyUnhealthy(String),

    /// The dependency graph contains a cycle
    #[error("Cyclic dependency: {0}")]
    CyclicDependency(String),

    /// Service unavailable errors
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Telegram-client bridge errors
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// Monitoring errors
    #[error("Monitoring error: {0}")]
    Monitoring(String),

    /// Alert errors
    #[error("Alert error: {0}")]
    Alert(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}
