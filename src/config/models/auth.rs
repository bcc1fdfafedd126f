//! Authentication configuration

use super::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bearer-token authentication for the admin surface and the WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Require a valid JWT on protected endpoints
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// HMAC secret for HS256 tokens
    #[serde(default)]
    pub jwt_secret: String,
    /// Expected token issuer
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    /// Lifetime of tokens minted by the gateway, in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jwt_secret: String::new(),
            issuer: default_jwt_issuer(),
            jwt_expiration: default_jwt_expiration(),
        }
    }
}

impl AuthConfig {
    /// Validate auth configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.jwt_secret.is_empty() {
            return Err("JWT secret is required when auth is enabled".to_string());
        }
        Ok(())
    }
}

/// Log loudly about configurations that are unsafe outside development
pub fn warn_insecure_config(config: &AuthConfig) {
    if !config.enabled {
        warn!("Authentication is disabled; /services and /ws are open to anyone");
    } else if config.jwt_secret.len() < 32 {
        warn!("JWT secret is shorter than 32 characters");
    }
}
