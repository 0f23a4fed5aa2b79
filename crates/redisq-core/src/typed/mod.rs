//! Typed - 型付き callback API
//!
//! body（`serde_json::Value`）を Rust の型に decode してから handler に渡します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait, `Handler<T>` trait - 型安全
//! - **内部（Dyn）**: `TaskCallback` - consume ループが呼ぶ object-safe な trait

pub mod handler;
pub mod task;

// 主要な trait/型 を再エクスポート
pub use self::handler::{Handler, TypedCallback};
pub use self::task::Task;
