//! Key-value operations

use super::pool::RedisStore;
use crate::utils::error::{GatewayError, Result};
use redis::{AsyncCommands, RedisResult};

impl RedisStore {
    pub(crate) async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn();
        let result: RedisResult<Option<String>> = conn.get(key).await;
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.kind() == redis::ErrorKind::TypeError => Ok(None),
            Err(e) => Err(GatewayError::Redis(e)),
        }
    }

    pub(crate) async fn set_value(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        let mut conn = self.conn();
        match ttl {
            Some(ttl_seconds) => {
                let _: () = conn
                    .set_ex(key, value, ttl_seconds.max(1))
                    .await
                    .map_err(GatewayError::Redis)?;
            }
            None => {
                let _: () = conn.set(key, value).await.map_err(GatewayError::Redis)?;
            }
        }
        Ok(())
    }

    pub(crate) async fn delete_key(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn();
        let removed: u64 = conn.del(key).await.map_err(GatewayError::Redis)?;
        Ok(removed > 0)
    }

    pub(crate) async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let pattern = format!("{}*", prefix);
        let keys: Vec<String> = conn.keys(pattern).await.map_err(GatewayError::Redis)?;
        Ok(keys)
    }

    /// INCR, arming the expiry only when the window opens
    pub(crate) async fn incr_with_expiry(&self, key: &str, ttl: u64) -> Result<u64> {
        let mut conn = self.conn();
        let count: u64 = conn.incr(key, 1u64).await.map_err(GatewayError::Redis)?;
        if count == 1 {
            let _: () = conn
                .expire(key, ttl.max(1) as i64)
                .await
                .map_err(GatewayError::Redis)?;
        }
        Ok(count)
    }
}
