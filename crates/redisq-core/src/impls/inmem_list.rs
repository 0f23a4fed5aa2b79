//! InMemoryListStore - 開発・テスト用の blocking list
//!
//! # 実装詳細
//! - HashMap<String, VecDeque<Vec<u8>>> で queue key ごとに list を管理
//! - tokio::sync::Mutex で排他制御（ロックを跨いで待たない）
//! - Notify で push 時に待機中の pop を起こす

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use crate::domain::StoreError;
use crate::ports::ListStore;

#[derive(Default)]
struct Lists {
    items: HashMap<String, VecDeque<Vec<u8>>>,
    closed: bool,
}

/// InMemoryListStore は開発用の blocking list
///
/// 各 item は 1 回の pop でちょうど 1 つの waiter に渡ります。
/// 待機中の pop が drop されても item は失われません。
///
/// # 使用例
/// ```ignore
/// let store = InMemoryListStore::new();
/// store.tail_push("default", bytes).await?;
/// let item = store.blocking_head_pop("default", Duration::from_secs(5)).await?;
/// ```
#[derive(Default)]
pub struct InMemoryListStore {
    lists: Mutex<Lists>,
    notify: Notify,
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items waiting under `queue_key`.
    pub async fn len(&self, queue_key: &str) -> usize {
        let lists = self.lists.lock().await;
        lists.items.get(queue_key).map_or(0, VecDeque::len)
    }

    pub async fn is_empty(&self, queue_key: &str) -> bool {
        self.len(queue_key).await == 0
    }

    /// Copy of the items under `queue_key`, head first.
    pub async fn snapshot(&self, queue_key: &str) -> Vec<Vec<u8>> {
        let lists = self.lists.lock().await;
        lists
            .items
            .get(queue_key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Reject further pushes and pops; waiting pops return `StoreError::Closed`.
    pub async fn close(&self) {
        self.lists.lock().await.closed = true;
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn tail_push(&self, queue_key: &str, item: Vec<u8>) -> Result<(), StoreError> {
        {
            let mut lists = self.lists.lock().await;
            if lists.closed {
                return Err(StoreError::Closed);
            }
            lists
                .items
                .entry(queue_key.to_string())
                .or_default()
                .push_back(item);
        }

        // 待機中の pop を全部起こす（key が違う waiter は再び待つ）
        self.notify.notify_waiters();
        Ok(())
    }

    async fn blocking_head_pop(
        &self,
        queue_key: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // list を見る前に登録しておく（push の取りこぼし防止）
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut lists = self.lists.lock().await;
                if lists.closed {
                    return Err(StoreError::Closed);
                }
                if let Some(item) = lists.items.get_mut(queue_key).and_then(VecDeque::pop_front) {
                    return Ok(Some(item));
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }
}
