//! Helper functions for creating specific error types

use super::types::GatewayError;

impl GatewayError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage(message.into())
    }

    pub fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    pub fn upstream_transport<S: Into<String>>(message: S) -> Self {
        Self::UpstreamTransport(message.into())
    }

    pub fn health_check<S: Into<String>>(message: S) -> Self {
        Self::HealthCheck(message.into())
    }

    pub fn bridge<S: Into<String>>(message: S) -> Self {
        Self::Bridge(message.into())
    }

    pub fn rate_limit<S: Into<String>>(message: S, retry_at: i64) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_at,
        }
    }

    pub fn circuit_open<S: Into<String>>(name: S, next_attempt: i64) -> Self {
        Self::CircuitOpen {
            name: name.into(),
            next_attempt,
        }
    }

    /// Whether the error was produced by an open circuit breaker
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether the error means the upstream could not be reached at all
    pub fn is_transport(&self) -> bool {
        match self {
            Self::UpstreamTransport(_) | Self::Timeout(_) => true,
            Self::HttpClient(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}
