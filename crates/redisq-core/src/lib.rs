//! redisq-core
//!
//! At-least-once work queue over a blocking list store.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（envelope, callback result, consumer state, errors）
//! - **ports**: 抽象化レイヤー（ListStore, EnvelopeCodec, Clock, TaskNameGenerator）
//! - **app**: アプリケーションロジック（Publisher, Consumer, Shutdown, TaskCallback）
//! - **typed**: 型付き callback API（Task trait, Handler trait, TypedCallback）
//! - **impls**: 実装（InMemoryListStore、`redis` feature で RedisListStore）
//! - **config**: QueueConfig（環境変数からの読み込み）
//! - **telemetry**: tracing-subscriber の初期化
//!
//! # 使用例
//! ```ignore
//! let store = Arc::new(InMemoryListStore::new());
//! let publisher = Publisher::new(store.clone(), "jobs");
//! publisher.publish(json!({"to": "user@example.com"})).await?;
//!
//! let consumer = Consumer::new(store, QueueConfig::new("jobs").with_max_delivery(3));
//! consumer.shutdown().listen_for_signals();
//! let report = consumer
//!     .consume(&callback_fn(|body, meta, name| {
//!         println!("{name} (delivery {}): {body}", meta.delivery_count() + 1);
//!         Ok::<_, CallbackError>(CallbackResult::Ack)
//!     }))
//!     .await?;
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod telemetry;
pub mod typed;

pub use app::{ConsumeReport, Consumer, Publisher, Shutdown, TaskCallback, callback_fn};
pub use config::{CallbackErrorPolicy, ConfigError, QueueConfig};
pub use domain::{
    CallbackError, CallbackResult, ConsumeError, PublishError, StopCause, TaskEnvelope, TaskMeta,
};
