//! Redis client and self-healing connection

use crate::config::RedisConfig;
use crate::utils::error::{GatewayError, Result};
use redis::Client;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;
use tracing::{debug, info};

/// Reconnect attempts per dropped connection
const CONNECT_RETRIES: usize = 2;

/// Redis-backed persistent store
#[derive(Clone)]
pub struct RedisStore {
    /// Redis client, also used to open pub/sub connections
    pub(crate) client: Client,
    /// Shared connection for commands, re-established after the server
    /// drops it
    pub(crate) connection: ConnectionManager,
    /// Configuration
    pub(crate) config: RedisConfig,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &Self::sanitize_url(&self.config.url))
            .finish()
    }
}

impl RedisStore {
    /// Connect to Redis
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        info!("Creating Redis connection");
        debug!("Redis URL: {}", Self::sanitize_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(GatewayError::Redis)?;

        let timeout = Duration::from_secs(config.connection_timeout.max(1));
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(timeout)
            .set_number_of_retries(CONNECT_RETRIES);
        let connection = tokio::time::timeout(
            timeout,
            ConnectionManager::new_with_config(client.clone(), manager_config),
        )
        .await
        .map_err(|_| {
            GatewayError::Storage(format!(
                "Timed out connecting to Redis at {}",
                Self::sanitize_url(&config.url)
            ))
        })?
        .map_err(GatewayError::Redis)?;

        info!("Redis connection established");
        Ok(Self {
            client,
            connection,
            config: config.clone(),
        })
    }

    /// Connection handle for one command
    pub(crate) fn conn(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// PING the server
    pub async fn ping(&self) -> Result<()> {
        debug!("Performing Redis health check");
        let mut conn = self.conn();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(GatewayError::Redis)?;
        Ok(())
    }

    /// Sanitize Redis URL for logging (hide password)
    pub(crate) fn sanitize_url(url: &str) -> String {
        if let Ok(parsed) = url::Url::parse(url) {
            let mut sanitized = parsed.clone();
            if sanitized.password().is_some() {
                let _ = sanitized.set_password(Some("***"));
            }
            sanitized.to_string()
        } else {
            "invalid_url".to_string()
        }
    }
}
