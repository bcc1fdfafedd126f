//! Store doubles for tests

use super::{MemoryStore, PersistentStore};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// In-process store whose writes and counters answer only after `delay`
#[derive(Debug)]
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl PersistentStore for SlowStore {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.keys(prefix).await
    }

    async fn incr_window(&self, key: &str, ttl: u64) -> Result<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.incr_window(key, ttl).await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>> {
        self.inner.subscribe(channel).await
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
