//! Impls - ports の実装
//!
//! - InMemoryListStore: 開発・テスト用
//! - RedisListStore: 本番用（`redis` feature）

pub mod inmem_list;
#[cfg(feature = "redis")]
pub mod redis_list;

pub use self::inmem_list::InMemoryListStore;
#[cfg(feature = "redis")]
pub use self::redis_list::RedisListStore;
