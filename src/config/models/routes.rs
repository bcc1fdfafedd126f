//! Static route table configuration

use serde::{Deserialize, Serialize};

/// One proxied path prefix and the upstream it forwards to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    /// Route name, also the default circuit breaker name
    pub name: String,
    /// Path prefix, e.g. `/core`
    pub prefix: String,
    /// Upstream base URL, e.g. `http://localhost:3001`
    pub upstream: String,
    /// Breaker name when several routes share one upstream
    #[serde(default)]
    pub breaker: Option<String>,
    /// Remove the prefix before forwarding
    #[serde(default)]
    pub strip_prefix: bool,
    /// Per-route proxy deadline; falls back to the breaker timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RouteConfig {
    pub fn new(name: &str, prefix: &str, upstream: &str, strip_prefix: bool) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            upstream: upstream.to_string(),
            breaker: None,
            strip_prefix,
            timeout_ms: None,
        }
    }

    /// Builder-style breaker name override
    pub fn with_breaker(mut self, breaker: &str) -> Self {
        self.breaker = Some(breaker.to_string());
        self
    }

    /// Name of the breaker guarding this route
    pub fn breaker_name(&self) -> &str {
        self.breaker.as_deref().unwrap_or(&self.name)
    }

    /// Environment variable that overrides this route's upstream
    pub fn env_key(&self) -> String {
        format!("{}_SERVICE_URL", self.name.to_uppercase().replace('-', "_"))
    }
}

/// Grouped gateway prefixes plus the direct compatibility routes
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("core", "/core", "http://localhost:3001", true),
        RouteConfig::new("user", "/user", "http://localhost:3002", true),
        RouteConfig::new("content", "/content", "http://localhost:3003", true),
        RouteConfig::new("frontend", "/frontend", "http://localhost:3004", true),
        RouteConfig::new("special", "/special", "http://localhost:3005", true),
        RouteConfig::new("auth", "/api/auth", "http://localhost:3002", false),
        RouteConfig::new("bot", "/api/bot", "http://localhost:3001", false),
        RouteConfig::new("media", "/api/media", "http://localhost:3003", false),
        RouteConfig::new("tdlib", "/api/tdlib", "http://localhost:3006", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_name_defaults_to_route_name() {
        let route = RouteConfig::new("core", "/core", "http://localhost:3001", true);
        assert_eq!(route.breaker_name(), "core");

        let route = route.with_breaker("shared");
        assert_eq!(route.breaker_name(), "shared");
    }

    #[test]
    fn test_env_key() {
        let route = RouteConfig::new("media-v2", "/m", "http://localhost:1", false);
        assert_eq!(route.env_key(), "MEDIA_V2_SERVICE_URL");
    }

    #[test]
    fn test_default_routes_have_unique_prefixes() {
        let routes = default_routes();
        let mut prefixes: Vec<_> = routes.iter().map(|r| r.prefix.clone()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), routes.len());
    }
}
