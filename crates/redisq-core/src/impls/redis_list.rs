//! RedisListStore - Redis list（`RPUSH` / `BLPOP`）による ListStore
//!
//! `BLPOP` は待機中の client のうち 1 つにだけ item を渡すので、
//! pop の atomicity は Redis 側が保証します。

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::StoreError;
use crate::ports::ListStore;

/// Redis-backed list store over a multiplexed async connection.
///
/// A blocking `BLPOP` occupies the connection until it returns, so give the consumer
/// its own store instead of sharing one with a busy publisher.
#[derive(Clone)]
pub struct RedisListStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisListStore {
    /// Connect to `redis_url` (e.g. "redis://localhost:6379").
    pub async fn open(redis_url: impl AsRef<str>) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::debug!(redis_url = %redis_url.as_ref(), "connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    async fn tail_push(&self, queue_key: &str, item: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _len: i64 = redis::cmd("RPUSH")
            .arg(queue_key)
            .arg(item)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn blocking_head_pop(
        &self,
        queue_key: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        // BLPOP の timeout は秒（小数可）。0 は無期限待ちになるので最小値に丸める
        let timeout_secs = timeout.as_secs_f64().max(0.001);
        let reply: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
            .arg(queue_key)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;
        Ok(reply.map(|(_key, item)| item))
    }
}
