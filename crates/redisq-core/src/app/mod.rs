//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **Publisher**: envelope を作って tail に push
//! - **Consumer**: blocking pop → callback → requeue / discard / stop のループ
//! - **Shutdown**: signal や明示的な停止要求をループに伝える
//! - **TaskCallback**: ループが呼ぶ user 側の処理

pub mod callback;
pub mod consumer;
pub mod publisher;
pub mod shutdown;

// 主要な型を再エクスポート
pub use self::callback::{FnCallback, TaskCallback, callback_fn};
pub use self::consumer::{ConsumeReport, Consumer};
pub use self::publisher::Publisher;
pub use self::shutdown::Shutdown;
