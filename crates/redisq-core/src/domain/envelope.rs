//! TaskEnvelope - キューに格納される唯一の単位
//!
//! Envelope は payload（body）と配送メタデータ（meta）をまとめたものです。
//! store 上の envelope は書き換えられず、requeue は更新後の envelope を
//! tail に新しく push することで表現します。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery metadata carried alongside the body.
///
/// Invariant: `delivery_count >= retry_count`. Only [`TaskMeta::record_delivery`] and
/// [`TaskMeta::record_retry`] change the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMeta {
    published_at: DateTime<Utc>,

    /// Number of callback-requested requeues.
    #[serde(alias = "retry")]
    retry_count: u32,

    /// Number of times the envelope was popped and handed to a callback.
    #[serde(alias = "delivery")]
    delivery_count: u32,
}

impl TaskMeta {
    pub fn new(published_at: DateTime<Utc>) -> Self {
        Self {
            published_at,
            retry_count: 0,
            delivery_count: 0,
        }
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// Count one hand-off to the callback. Returns the new delivery count.
    pub fn record_delivery(&mut self) -> u32 {
        self.delivery_count = self.delivery_count.saturating_add(1);
        self.delivery_count
    }

    /// Count one requeue. Never lets the retry count overtake the delivery count.
    pub fn record_retry(&mut self) -> u32 {
        if self.retry_count < self.delivery_count {
            self.retry_count += 1;
        }
        self.retry_count
    }
}

/// name + body + meta の“運搬用”データ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    name: String,
    #[serde(default)]
    body: serde_json::Value,
    meta: TaskMeta,
}

impl TaskEnvelope {
    pub fn new(name: impl Into<String>, body: serde_json::Value, published_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            body,
            meta: TaskMeta::new(published_at),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    pub fn meta(&self) -> &TaskMeta {
        &self.meta
    }

    pub(crate) fn meta_mut(&mut self) -> &mut TaskMeta {
        &mut self.meta
    }
}
