//! Task trait - body として運べる型

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Task は envelope の body として publish / decode できる型
///
/// # Trait Bounds
/// - `Serialize`: publish 時に body へ変換するため
/// - `DeserializeOwned`: consume 時に body から復元するため（'static に対応）
/// - `Send + Sync`: 複数スレッドから安全に使えるため
///
/// 条件を満たす型には自動で実装されます。
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Task for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}
