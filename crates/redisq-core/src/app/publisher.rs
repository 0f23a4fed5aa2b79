//! Publisher - envelope を作って queue の tail に push する
//!
//! # フロー
//! 1. name が空なら TaskNameGenerator で生成
//! 2. delivery = 0, retry = 0, publishedAt = now で envelope を作成
//! 3. EnvelopeCodec で serialize
//! 4. ListStore::tail_push
//!
//! serialize か push のどちらかが失敗したら何も書かれていません。

use std::sync::Arc;

use tracing::debug;

use crate::domain::{CodecError, PublishError, TaskEnvelope};
use crate::ports::{
    Clock, EnvelopeCodec, JsonCodec, ListStore, SequentialNameGenerator, SystemClock,
    TaskNameGenerator,
};
use crate::typed::Task;

/// Appends tasks to one queue.
///
/// Each publisher owns its default-name counter, so two publishers in one process
/// never share it.
pub struct Publisher<S, K = JsonCodec> {
    store: S,
    codec: K,
    queue_key: String,
    clock: Arc<dyn Clock>,
    names: Box<dyn TaskNameGenerator>,
}

impl<S: ListStore> Publisher<S, JsonCodec> {
    pub fn new(store: S, queue_key: impl Into<String>) -> Self {
        Self {
            store,
            codec: JsonCodec,
            queue_key: queue_key.into(),
            clock: Arc::new(SystemClock),
            names: Box::new(SequentialNameGenerator::new(SystemClock)),
        }
    }
}

impl<S: ListStore, K: EnvelopeCodec> Publisher<S, K> {
    pub fn with_codec<K2: EnvelopeCodec>(self, codec: K2) -> Publisher<S, K2> {
        Publisher {
            store: self.store,
            codec,
            queue_key: self.queue_key,
            clock: self.clock,
            names: self.names,
        }
    }

    /// Use `clock` for `publishedAt` and for default names (the name counter restarts).
    pub fn with_clock<C: Clock + Clone + 'static>(mut self, clock: C) -> Self {
        self.names = Box::new(SequentialNameGenerator::new(clock.clone()));
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_name_generator(mut self, names: impl TaskNameGenerator + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Publish with a generated name.
    pub async fn publish(&self, body: serde_json::Value) -> Result<TaskEnvelope, PublishError> {
        self.publish_named(body, "").await
    }

    /// Publish under `name`; an empty name means "generate one".
    pub async fn publish_named(
        &self,
        body: serde_json::Value,
        name: &str,
    ) -> Result<TaskEnvelope, PublishError> {
        let name = if name.is_empty() {
            self.names.next_name()
        } else {
            name.to_string()
        };

        let envelope = TaskEnvelope::new(name, body, self.clock.now());
        let raw = self.codec.encode(&envelope)?;
        self.store.tail_push(&self.queue_key, raw).await?;

        debug!(queue_key = %self.queue_key, task = envelope.name(), "task published");
        Ok(envelope)
    }

    /// Serialize a typed task into the body and publish it.
    pub async fn publish_typed<T: Task>(
        &self,
        task: &T,
        name: &str,
    ) -> Result<TaskEnvelope, PublishError> {
        let body = serde_json::to_value(task).map_err(|e| CodecError::Encode(Box::new(e)))?;
        self.publish_named(body, name).await
    }
}
