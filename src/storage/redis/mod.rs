//! Redis storage implementation
//!
//! ## Module Structure
//!
//! - `pool` - Client, multiplexed connection and health checks
//! - `cache` - Key-value operations and windowed counters
//! - `pubsub` - Publish and subscribe for the update channel

mod cache;
mod pool;
mod pubsub;

pub use pool::RedisStore;

use super::PersistentStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

#[async_trait]
impl PersistentStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        self.set_value(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.delete_key(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.keys_with_prefix(prefix).await
    }

    async fn incr_window(&self, key: &str, ttl: u64) -> Result<u64> {
        self.incr_with_expiry(key, ttl).await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize> {
        self.publish_message(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>> {
        self.subscribe_channel(channel).await
    }

    async fn health_check(&self) -> Result<()> {
        self.ping().await
    }
}
