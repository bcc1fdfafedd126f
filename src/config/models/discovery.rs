//! Service discovery configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Where `discover_services` looks for backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Gateways exposing a self-reporting `/services` endpoint
    #[serde(default)]
    pub gateways: Vec<String>,
    /// Well-known local ports scanned on their health endpoint
    #[serde(default = "default_well_known")]
    pub well_known: Vec<WellKnownService>,
    /// Host used for well-known ports
    #[serde(default = "default_discovery_host")]
    pub host: String,
    /// Per-port scan timeout
    #[serde(default = "default_discovery_timeout_ms")]
    pub timeout_ms: u64,
    /// Run discovery once at boot
    #[serde(default)]
    pub on_startup: bool,
}

fn default_discovery_host() -> String {
    "localhost".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            gateways: Vec::new(),
            well_known: default_well_known(),
            host: default_discovery_host(),
            timeout_ms: default_discovery_timeout_ms(),
            on_startup: false,
        }
    }
}

/// A backend expected on a fixed port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellKnownService {
    pub id: String,
    pub port: u16,
    #[serde(default = "default_health_path")]
    pub health_endpoint: String,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub priority: i32,
}

impl WellKnownService {
    fn new(id: &str, port: u16, critical: bool, priority: i32) -> Self {
        Self {
            id: id.to_string(),
            port,
            health_endpoint: default_health_path(),
            critical,
            priority,
        }
    }
}

fn default_well_known() -> Vec<WellKnownService> {
    vec![
        WellKnownService::new("bot", 3001, true, 1),
        WellKnownService::new("auth", 3002, true, 0),
        WellKnownService::new("media", 3003, false, 2),
        WellKnownService::new("frontend", 3004, false, 3),
        WellKnownService::new("tdlib", 3006, false, 2),
    ]
}
