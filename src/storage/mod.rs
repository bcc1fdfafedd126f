//! Persistent store for the gateway
//!
//! Service descriptors, request traces, rate-limit counters and the
//! real-time update channel all go through [`PersistentStore`]. Redis backs
//! it in production; [`MemoryStore`] satisfies the same contract when Redis
//! is disabled.

pub mod memory;
pub mod redis;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use crate::config::StorageConfig;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key-value store with TTLs, windowed counters and pub/sub
#[async_trait]
pub trait PersistentStore: Send + Sync + std::fmt::Debug {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Get a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value with an optional TTL in seconds
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All live keys starting with `prefix`
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Increment a counter, starting a `ttl` second window on first use
    async fn incr_window(&self, key: &str, ttl: u64) -> Result<u64>;

    /// Publish a message, returning the number of receivers
    async fn publish(&self, channel: &str, message: &str) -> Result<usize>;

    /// Subscribe to a channel
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> Result<()>;
}

/// Shared handle to the selected store backend
pub type SharedStore = Arc<dyn PersistentStore>;

/// Storage layer that owns the selected backend and its key conventions
#[derive(Debug, Clone)]
pub struct StorageLayer {
    store: SharedStore,
    config: StorageConfig,
}

impl StorageLayer {
    /// Open the configured backend.
    ///
    /// An enabled but unreachable Redis is a fatal startup error.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        info!("Initializing storage layer");

        let store: SharedStore = if config.redis.enabled {
            debug!("Connecting to Redis");
            let store = RedisStore::new(&config.redis).await?;
            store.health_check().await.map_err(|e| {
                GatewayError::Storage(format!("Redis unreachable at startup: {}", e))
            })?;
            Arc::new(store)
        } else {
            warn!("Redis disabled, using in-process store; state will not survive restarts");
            Arc::new(MemoryStore::new())
        };

        info!("Storage layer initialized with {} backend", store.name());
        Ok(Self {
            store,
            config: config.clone(),
        })
    }

    /// Wrap an existing backend
    pub fn with_store(store: SharedStore, config: StorageConfig) -> Self {
        Self { store, config }
    }

    /// In-process storage with default TTLs
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), StorageConfig::default())
    }

    /// The underlying backend
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Descriptor TTL in seconds
    pub fn service_ttl(&self) -> u64 {
        self.config.service_ttl
    }

    /// Trace TTL in seconds
    pub fn trace_ttl(&self) -> u64 {
        self.config.trace_ttl
    }

    /// Deadline applied by [`StorageLayer::bounded`]
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.config.op_timeout_ms)
    }

    /// Run a store call on the request path, failing with a timeout error
    /// once [`StorageLayer::op_timeout`] elapses
    pub async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.op_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::timeout(format!(
                "{} store call exceeded {}ms",
                op, self.config.op_timeout_ms
            ))),
        }
    }

    /// Serialize and store a value
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.store.set(key, &encoded, ttl).await
    }

    /// Load and deserialize a value
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }
}
