//! HTTP response handling for errors

use super::types::GatewayError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

impl GatewayError {
    /// Status code and stable error code for this error
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            GatewayError::Redis(_) | GatewayError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            GatewayError::Auth(_) | GatewayError::Jwt(_) => {
                (StatusCode::UNAUTHORIZED, "AUTH_ERROR")
            }
            GatewayError::RateLimit { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
            GatewayError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            GatewayError::BadRequest(_) | GatewayError::Serialization(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GatewayError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            GatewayError::CircuitOpen { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "CIRCUIT_BREAKER_OPEN")
            }
            GatewayError::UpstreamTransport(_) | GatewayError::HttpClient(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_UNREACHABLE")
            }
            GatewayError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            GatewayError::DependencyUnhealthy(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "DEPENDENCY_UNHEALTHY")
            }
            GatewayError::Bridge(_) => (StatusCode::BAD_GATEWAY, "BRIDGE_ERROR"),
            GatewayError::CyclicDependency(_) => (StatusCode::CONFLICT, "CYCLIC_DEPENDENCY"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        self.to_response(None)
    }
}

impl GatewayError {
    /// Render the error envelope, tagged with the request's correlation id
    /// when one is known
    pub fn to_response(&self, request_id: Option<&str>) -> HttpResponse {
        let (status_code, error_code) = self.status_and_code();

        // Internal details stay in the logs
        let message = match self {
            GatewayError::Redis(_) | GatewayError::Storage(_) => {
                "Storage operation failed".to_string()
            }
            GatewayError::Io(_) | GatewayError::Internal(_) | GatewayError::Yaml(_) => {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let retry_after = match self {
            GatewayError::CircuitOpen { next_attempt, .. } => Some(*next_attempt),
            GatewayError::RateLimit { retry_at, .. } => Some(*retry_at),
            _ => None,
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: error_code.to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
                request_id: request_id.map(str::to_string),
                retry_after,
            },
        };

        let mut builder = HttpResponse::build(status_code);
        if let Some(next_attempt) = retry_after {
            builder.insert_header(("Retry-After", retry_after_seconds(next_attempt).to_string()));
        }
        builder.json(error_response)
    }
}

/// Seconds from now until `next_attempt` (epoch millis), rounded up, never below 1
pub fn retry_after_seconds(next_attempt: i64) -> i64 {
    let remaining_ms = next_attempt - chrono::Utc::now().timestamp_millis();
    ((remaining_ms + 999) / 1000).max(1)
}

/// Standard error response format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
    pub request_id: Option<String>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none", default)]
    pub retry_after: Option<i64>,
}
