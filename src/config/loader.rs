//! Environment overrides applied on top of file or default configuration

use super::models::*;
use crate::utils::error::{GatewayError, Result};
use std::str::FromStr;
use tracing::debug;

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| GatewayError::Config(format!("Invalid value for {}: {}", key, e)))
}

impl GatewayConfig {
    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!("Applying environment overrides");

        macro_rules! set {
            ($key:literal, $field:expr) => {
                if let Some(value) = lookup($key) {
                    $field = parse_var($key, &value)?;
                }
            };
        }

        // Server
        if let Some(host) = lookup("GATEWAY_HOST") {
            self.server.host = host;
        }
        set!("GATEWAY_PORT", self.server.port);

        // Storage
        if let Some(url) = lookup("REDIS_URL") {
            self.storage.redis.url = url;
            self.storage.redis.enabled = true;
        }
        set!("REDIS_ENABLED", self.storage.redis.enabled);

        // Auth
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
            self.auth.enabled = true;
        }
        set!("AUTH_ENABLED", self.auth.enabled);

        // Rate limiting
        set!("RATE_LIMIT_WINDOW_MS", self.rate_limit.window_ms);
        set!("RATE_LIMIT_MAX", self.rate_limit.max_requests);

        // Circuit breaker defaults
        set!("CB_THRESHOLD", self.circuit_breaker.threshold);
        set!("CB_RESET_TIMEOUT_MS", self.circuit_breaker.reset_timeout_ms);
        set!("CB_ERROR_THRESHOLD", self.circuit_breaker.error_threshold);
        set!("CB_VOLUME_THRESHOLD", self.circuit_breaker.volume_threshold);

        // Health monitoring
        set!("HEALTH_CHECK_INTERVAL_MS", self.monitoring.interval_ms);
        set!("HEALTH_CHECK_RETRIES", self.monitoring.retries);
        set!("HEALTH_ALERT_THRESHOLD", self.monitoring.alert_threshold);
        set!("CPU_THRESHOLD", self.monitoring.thresholds.cpu);
        set!("MEMORY_THRESHOLD", self.monitoring.thresholds.memory);
        set!("DISK_THRESHOLD", self.monitoring.thresholds.disk);
        set!(
            "RESPONSE_TIME_THRESHOLD_MS",
            self.monitoring.thresholds.response_time_ms
        );
        set!("ERROR_RATE_THRESHOLD", self.monitoring.thresholds.error_rate);
        if let Some(webhook) = lookup("ALERT_WEBHOOK_URL") {
            self.monitoring.alerting.webhook_url = Some(webhook);
        }

        // Bridge
        if let Some(url) = lookup("BRIDGE_URL") {
            self.bridge.url = url;
            self.bridge.enabled = true;
        }

        // Per-route upstreams
        for route in &mut self.routes {
            if let Some(upstream) = lookup(&route.env_key()) {
                debug!("Route {} upstream overridden: {}", route.name, upstream);
                route.upstream = upstream;
            }
        }

        Ok(())
    }
}
