//! Tests for error handling

use super::response::{ErrorResponse, retry_after_seconds};
use super::types::GatewayError;
use actix_web::ResponseError;
use actix_web::http::StatusCode;

// ==================== Helper Function Tests ====================

#[test]
fn test_auth_helper() {
    let error = GatewayError::auth("Invalid token");
    assert!(matches!(error, GatewayError::Auth(msg) if msg == "Invalid token"));
}

#[test]
fn test_not_found_helper() {
    let error = GatewayError::not_found("service auth");
    assert!(matches!(error, GatewayError::NotFound(msg) if msg == "service auth"));
}

#[test]
fn test_circuit_open_helper() {
    let error = GatewayError::circuit_open("core", 1_700_000_000_000);
    assert!(error.is_circuit_open());
    assert!(matches!(
        error,
        GatewayError::CircuitOpen { ref name, next_attempt }
            if name == "core" && next_attempt == 1_700_000_000_000
    ));
}

#[test]
fn test_transport_classification() {
    assert!(GatewayError::upstream_transport("connection refused").is_transport());
    assert!(GatewayError::timeout("deadline").is_transport());
    assert!(!GatewayError::bad_request("nope").is_transport());
    assert!(!GatewayError::circuit_open("core", 0).is_transport());
}

// ==================== Display Tests ====================

#[test]
fn test_error_display() {
    let error = GatewayError::health_check("auth: connection refused");
    assert_eq!(
        error.to_string(),
        "Health check failed: auth: connection refused"
    );

    let error = GatewayError::CyclicDependency("a -> b -> a".to_string());
    assert_eq!(error.to_string(), "Cyclic dependency: a -> b -> a");
}

// ==================== HTTP Mapping Tests ====================

#[test]
fn test_status_codes() {
    assert_eq!(
        GatewayError::circuit_open("core", 0).status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        GatewayError::upstream_transport("refused").status_code(),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        GatewayError::auth("missing").status_code(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        GatewayError::not_found("x").status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        GatewayError::rate_limit("slow down", 0).status_code(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[test]
fn test_circuit_open_response_has_retry_after_header() {
    let next_attempt = chrono::Utc::now().timestamp_millis() + 30_000;
    let response = GatewayError::circuit_open("core", next_attempt).error_response();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let header = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap();
    assert!((29..=30).contains(&header));
}

#[test]
fn test_internal_errors_are_masked() {
    let response = GatewayError::internal("secret detail").error_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn test_response_carries_request_id() {
    let response = GatewayError::not_found("service auth").to_response(Some("req-42"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
    let envelope: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope.error.code, "NOT_FOUND");
    assert_eq!(envelope.error.request_id.as_deref(), Some("req-42"));

    let untagged = GatewayError::not_found("x").error_response();
    let body = actix_web::body::to_bytes(untagged.into_body()).await.unwrap();
    let envelope: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert!(envelope.error.request_id.is_none());
}

#[test]
fn test_retry_after_seconds_never_below_one() {
    let past = chrono::Utc::now().timestamp_millis() - 10_000;
    assert_eq!(retry_after_seconds(past), 1);
}
