//! Persistent store configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// TTL of persisted service descriptors in seconds
    #[serde(default = "default_service_ttl")]
    pub service_ttl: u64,
    /// TTL of persisted request traces in seconds
    #[serde(default = "default_trace_ttl")]
    pub trace_ttl: u64,
    /// Upper bound on a single store call made on the request path, in milliseconds
    #[serde(default = "default_store_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            service_ttl: default_service_ttl(),
            trace_ttl: default_trace_ttl(),
            op_timeout_ms: default_store_op_timeout_ms(),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL
    pub url: String,
    /// Use Redis; when disabled the in-process store is used
    #[serde(default)]
    pub enabled: bool,
    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,
}

fn default_redis_connection_timeout() -> u64 {
    5
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            enabled: false,
            connection_timeout: default_redis_connection_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_serde_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.service_ttl, 3600);
        assert_eq!(config.trace_ttl, 300);
        assert_eq!(config.op_timeout_ms, 1000);

        let parsed: StorageConfig =
            serde_yaml::from_str("redis:\n  url: redis://localhost:6379\n").unwrap();
        assert_eq!(parsed.service_ttl, config.service_ttl);
        assert_eq!(parsed.trace_ttl, config.trace_ttl);
        assert_eq!(parsed.op_timeout_ms, config.op_timeout_ms);
    }
}
