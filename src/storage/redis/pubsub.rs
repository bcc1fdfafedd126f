//! Redis Pub/Sub operations

use super::pool::RedisStore;
use crate::utils::error::{GatewayError, Result};
use futures::StreamExt;
use futures::stream::BoxStream;
use redis::AsyncCommands;
use tracing::{debug, warn};

impl RedisStore {
    pub(crate) async fn publish_message(&self, channel: &str, message: &str) -> Result<usize> {
        let mut conn = self.conn();
        let receivers: usize = conn
            .publish(channel, message)
            .await
            .map_err(GatewayError::Redis)?;
        Ok(receivers)
    }

    /// Dedicated pub/sub connection yielding string payloads
    pub(crate) async fn subscribe_channel(
        &self,
        channel: &str,
    ) -> Result<BoxStream<'static, String>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(GatewayError::Redis)?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(GatewayError::Redis)?;
        debug!("Subscribed to Redis channel {}", channel);

        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move {
                match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!("Dropping undecodable pub/sub payload: {}", e);
                        None
                    }
                }
            });
        Ok(Box::pin(stream))
    }
}
