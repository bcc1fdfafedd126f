//! Main gateway configuration

use super::*;
use crate::core::registry::ServiceRegistration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Static route table, one upstream per prefix
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
    /// Circuit breaker defaults and overrides
    #[serde(default)]
    pub circuit_breaker: BreakerConfig,
    /// Health monitoring
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Persistent store
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Service discovery
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Real-time update bridge
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Services registered at boot
    #[serde(default)]
    pub services: Vec<ServiceRegistration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            routes: default_routes(),
            circuit_breaker: BreakerConfig::default(),
            monitoring: MonitoringConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            discovery: DiscoveryConfig::default(),
            bridge: BridgeConfig::default(),
            services: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.circuit_breaker.validate()?;
        self.monitoring.validate()?;
        self.auth.validate()?;

        let mut prefixes = HashSet::new();
        for route in &self.routes {
            if !route.prefix.starts_with('/') {
                return Err(format!("Route prefix must start with '/': {}", route.prefix));
            }
            if !prefixes.insert(route.prefix.trim_end_matches('/')) {
                return Err(format!("Duplicate route prefix: {}", route.prefix));
            }
            url::Url::parse(&route.upstream)
                .map_err(|e| format!("Invalid upstream for route '{}': {}", route.name, e))?;
        }

        let mut ids = HashSet::new();
        for service in &self.services {
            if !ids.insert(service.id.as_str()) {
                return Err(format!("Duplicate service id: {}", service.id));
            }
            url::Url::parse(&service.endpoint)
                .map_err(|e| format!("Invalid endpoint for service '{}': {}", service.id, e))?;
        }

        if self.bridge.enabled {
            url::Url::parse(&self.bridge.url)
                .map_err(|e| format!("Invalid bridge url: {}", e))?;
        }

        Ok(())
    }

    /// Look up a route by name
    pub fn route(&self, name: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| r.name == name)
    }
}
