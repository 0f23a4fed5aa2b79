//! ListStore port - blocking list（Redis の list または InMemory）
//!
//! ListStore は serialize 済みの envelope（bytes）だけを流します。
//!
//! # 実装
//! - **InMemoryListStore**: 開発・テスト用
//! - **RedisListStore**: 本番用（`redis` feature）

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::StoreError;

/// ListStore は queue key ごとの FIFO list
///
/// # 設計原則
/// - tail に push、head から blocking pop（timeout 付き）
/// - pop は 1 item を 1 waiter だけに渡す（atomicity は実装側の責務）
/// - I/O 失敗はリトライせずそのまま返す
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Append one serialized item to the tail of `queue_key`.
    async fn tail_push(&self, queue_key: &str, item: Vec<u8>) -> Result<(), StoreError>;

    /// Remove and return the head of `queue_key`, waiting up to `timeout`.
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn blocking_head_pop(
        &self,
        queue_key: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError>;
}

#[async_trait]
impl<S: ListStore + ?Sized> ListStore for std::sync::Arc<S> {
    async fn tail_push(&self, queue_key: &str, item: Vec<u8>) -> Result<(), StoreError> {
        (**self).tail_push(queue_key, item).await
    }

    async fn blocking_head_pop(
        &self,
        queue_key: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).blocking_head_pop(queue_key, timeout).await
    }
}
