//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（Redis, 時刻, codec など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - store は serialize 済みの bytes だけを扱う
//! - codec は envelope の round-trip だけを保証する
//! - 時刻と name 生成は差し替え可能（テスト用）

pub mod clock;
pub mod codec;
pub mod list_store;
pub mod name_generator;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::codec::{EnvelopeCodec, JsonCodec};
pub use self::list_store::ListStore;
pub use self::name_generator::{SequentialNameGenerator, TaskNameGenerator, UlidNameGenerator};
