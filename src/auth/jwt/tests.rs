//! JWT module tests

use super::types::JwtHandler;
use crate::config::AuthConfig;
use crate::utils::error::GatewayError;

fn create_test_handler(secret: &str) -> JwtHandler {
    let config = AuthConfig {
        enabled: true,
        jwt_secret: secret.to_string(),
        issuer: "telegate".to_string(),
        jwt_expiration: 3600,
    };
    JwtHandler::new(&config)
}

#[test]
fn test_create_and_verify_token() {
    let handler = create_test_handler("test_secret_key_for_testing_only");

    let token = handler.create_token("ops", "admin").unwrap();
    let claims = handler.verify_token(&token).unwrap();

    assert_eq!(claims.sub, "ops");
    assert_eq!(claims.iss, "telegate");
    assert!(claims.is_admin());
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[test]
fn test_wrong_secret_is_rejected() {
    let issuer = create_test_handler("secret-one-secret-one-secret-one");
    let verifier = create_test_handler("secret-two-secret-two-secret-two");

    let token = issuer.create_token("ops", "client").unwrap();
    let result = verifier.verify_token(&token);
    assert!(matches!(result, Err(GatewayError::Jwt(_))));
}

#[test]
fn test_garbage_token_is_rejected() {
    let handler = create_test_handler("test_secret_key_for_testing_only");
    assert!(handler.verify_token("not.a.jwt").is_err());
}

#[test]
fn test_debug_redacts_keys() {
    let handler = create_test_handler("super-secret-value");
    let debug = format!("{:?}", handler);
    assert!(debug.contains("[REDACTED]"));
    assert!(!debug.contains("super-secret-value"));
}
