//! Static prefix -> upstream route table

use crate::config::RouteConfig;
use crate::utils::error::{GatewayError, Result};
use std::time::Duration;
use url::Url;

/// One resolved route
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    /// Normalized prefix without a trailing slash
    pub prefix: String,
    pub upstream: Url,
    /// Breaker guarding the upstream
    pub breaker: String,
    pub strip_prefix: bool,
    pub timeout: Option<Duration>,
}

impl Route {
    fn matches(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Path sent upstream for an inbound `path`
    pub fn forward_path(&self, path: &str) -> String {
        if !self.strip_prefix {
            return path.to_string();
        }
        let rest = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
        if rest.is_empty() {
            "/".to_string()
        } else {
            rest.to_string()
        }
    }

    /// Absolute upstream URL for an inbound path and query
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let base = self.upstream.as_str().trim_end_matches('/');
        let mut target = format!("{}{}", base, self.forward_path(path));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }
        target
    }
}

/// Routes ordered longest prefix first, fixed for the life of the process
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self> {
        let mut resolved = Vec::with_capacity(routes.len());
        for route in routes {
            let upstream = Url::parse(&route.upstream).map_err(|e| {
                GatewayError::config(format!("Invalid upstream for route {}: {}", route.name, e))
            })?;
            resolved.push(Route {
                name: route.name.clone(),
                prefix: route.prefix.trim_end_matches('/').to_string(),
                upstream,
                breaker: route.breaker_name().to_string(),
                strip_prefix: route.strip_prefix,
                timeout: route.timeout_ms.map(Duration::from_millis),
            });
        }
        resolved.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(Self { routes: resolved })
    }

    /// Longest matching prefix on a path-segment boundary
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }
}
