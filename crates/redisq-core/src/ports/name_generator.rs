//! TaskNameGenerator port - 既定の task name 生成の抽象化
//!
//! publish 時に name が指定されなかった場合に使われます。
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **SequentialNameGenerator**: `<timestamp>_<counter>`（既定）
//! - **UlidNameGenerator**: ULID ベース（複数プロセスから publish する場合）

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ports::Clock;
use ulid::Ulid;

/// TaskNameGenerator は task name を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait TaskNameGenerator: Send + Sync {
    fn next_name(&self) -> String;
}

/// `%Y%m%d%H%M%S_<n>`; `n` is owned by this instance and starts at 0.
///
/// Two generators never share a counter, so names are unique per instance but may
/// collide across instances that publish within the same second.
pub struct SequentialNameGenerator<C> {
    clock: C,
    counter: AtomicU64,
}

impl<C: Clock> SequentialNameGenerator<C> {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y%m%d%H%M%S";

    pub fn new(clock: C) -> Self {
        Self {
            clock,
            counter: AtomicU64::new(0),
        }
    }
}

impl<C: Clock> TaskNameGenerator for SequentialNameGenerator<C> {
    fn next_name(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let ts = self.clock.now().format(Self::TIMESTAMP_FORMAT);
        format!("{ts}_{n}")
    }
}

/// UlidNameGenerator は ULID ベースの name 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
pub struct UlidNameGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidNameGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> TaskNameGenerator for UlidNameGenerator<C> {
    fn next_name(&self) -> String {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random()).to_string()
    }
}
