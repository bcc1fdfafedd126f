//! Bearer-token authentication
//!
//! The same gate protects the admin endpoints and the WebSocket handshake.

pub mod jwt;

pub use jwt::{Claims, JwtHandler};

use crate::config::AuthConfig;
use crate::utils::error::{GatewayError, Result};
use tracing::debug;

/// Authentication gate resolved from configuration
#[derive(Debug, Clone)]
pub struct AuthGate {
    enabled: bool,
    jwt: JwtHandler,
}

impl AuthGate {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            enabled: config.enabled,
            jwt: JwtHandler::new(config),
        }
    }

    /// Whether tokens are required
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The token handler
    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    /// Verify an optional bearer token.
    ///
    /// With auth disabled every caller is admitted as an anonymous client.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Claims> {
        if !self.enabled {
            return Ok(Claims {
                sub: "anonymous".to_string(),
                iat: 0,
                exp: 0,
                iss: String::new(),
                role: "client".to_string(),
            });
        }

        let token = token.ok_or_else(|| GatewayError::auth("Missing bearer token"))?;
        let claims = self.jwt.verify_token(token)?;
        debug!("Authenticated subject {}", claims.sub);
        Ok(claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}
