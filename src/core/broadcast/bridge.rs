//! Telegram-client bridge capability
//!
//! The bridge is optional. When it is disabled a [`DisabledBridge`] stands
//! in so the broadcaster never has to check.

use crate::config::BridgeConfig;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Snapshot source and command target for WebSocket clients
#[async_trait]
pub trait BridgeClient: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// State sent to a client right after it connects
    async fn snapshot(&self) -> Result<Value>;

    /// Execute a client command
    async fn send_command(&self, command: &str, params: Value) -> Result<Value>;
}

/// Select the bridge implementation from configuration
pub fn bridge_from_config(config: &BridgeConfig) -> Result<Arc<dyn BridgeClient>> {
    if config.enabled {
        info!("Bridge enabled at {}", config.url);
        Ok(Arc::new(HttpBridge::new(config)?))
    } else {
        info!("Bridge disabled; WebSocket commands will be refused");
        Ok(Arc::new(DisabledBridge))
    }
}

/// Bridge reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBridge {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBridge {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BridgeClient for HttpBridge {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn snapshot(&self) -> Result<Value> {
        let url = format!("{}/snapshot", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::bridge(format!("snapshot request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(GatewayError::bridge(format!(
                "snapshot answered {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn send_command(&self, command: &str, params: Value) -> Result<Value> {
        debug!("Forwarding bridge command {}", command);
        let url = format!("{}/commands", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "command": command, "params": params }))
            .send()
            .await
            .map_err(|e| GatewayError::bridge(format!("command {} failed: {}", command, e)))?;
        if !response.status().is_success() {
            return Err(GatewayError::bridge(format!(
                "command {} answered {}",
                command,
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

/// Fallback used when no bridge is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBridge;

#[async_trait]
impl BridgeClient for DisabledBridge {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn snapshot(&self) -> Result<Value> {
        Ok(json!({ "channels": [], "bridge": "disabled" }))
    }

    async fn send_command(&self, command: &str, _params: Value) -> Result<Value> {
        Err(GatewayError::bridge(format!(
            "bridge disabled, cannot run {}",
            command
        )))
    }
}
