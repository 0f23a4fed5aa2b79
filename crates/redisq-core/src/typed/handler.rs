//! Handler trait - 型付き Task を処理する Handler の定義
//!
//! # Type erasure
//! `TypedCallback<T, H>` が body を `T` に decode し、`TaskCallback` として
//! consume ループに渡せる形にします。

use super::task::Task;
use crate::app::TaskCallback;
use crate::domain::{CallbackError, CallbackResult, TaskMeta};
use async_trait::async_trait;
use std::marker::PhantomData;

/// Handler は decode 済みの Task を処理して CallbackResult を返す
///
/// # 使用例
/// ```ignore
/// struct SendEmail;
///
/// #[async_trait]
/// impl Handler<Email> for SendEmail {
///     async fn handle(&self, email: Email, meta: &TaskMeta, name: &str)
///         -> Result<CallbackResult, CallbackError>
///     {
///         send(email).await?;
///         Ok(CallbackResult::Ack)
///     }
/// }
///
/// consumer.consume(&TypedCallback::new(SendEmail)).await?;
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(
        &self,
        task: T,
        meta: &TaskMeta,
        name: &str,
    ) -> Result<CallbackResult, CallbackError>;
}

/// Decodes the body into `T` before calling `H`.
///
/// A body that does not decode is reported as a [`CallbackError`], so the consumer's
/// callback-error policy applies to it.
pub struct TypedCallback<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedCallback<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> TaskCallback for TypedCallback<T, H> {
    async fn call(
        &self,
        body: &serde_json::Value,
        meta: &TaskMeta,
        name: &str,
    ) -> Result<CallbackResult, CallbackError> {
        let task: T = T::deserialize(body)
            .map_err(|e| CallbackError::with_source(format!("decode body of task {name}"), e))?;
        self.handler.handle(task, meta, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Resize {
        width: u32,
        height: u32,
    }

    #[derive(Default)]
    struct ResizeHandler {
        seen: Mutex<Vec<Resize>>,
    }

    #[async_trait]
    impl Handler<Resize> for ResizeHandler {
        async fn handle(
            &self,
            task: Resize,
            _meta: &TaskMeta,
            _name: &str,
        ) -> Result<CallbackResult, CallbackError> {
            let requeue = task.width == 0;
            self.seen.lock().unwrap().push(task);
            Ok(if requeue { CallbackResult::Requeue } else { CallbackResult::Ack })
        }
    }

    #[tokio::test]
    async fn test_typed_callback_decodes_body() {
        let callback = TypedCallback::new(ResizeHandler::default());
        let meta = TaskMeta::new(Utc::now());

        let result = callback
            .call(&json!({"width": 10, "height": 20}), &meta, "img-1")
            .await
            .unwrap();

        assert_eq!(result, CallbackResult::Ack);
        assert_eq!(
            callback.handler().seen.lock().unwrap().as_slice(),
            &[Resize { width: 10, height: 20 }]
        );
    }

    #[tokio::test]
    async fn test_typed_callback_passes_result_through() {
        let callback = TypedCallback::new(ResizeHandler::default());
        let meta = TaskMeta::new(Utc::now());

        let result = callback
            .call(&json!({"width": 0, "height": 1}), &meta, "img-2")
            .await
            .unwrap();
        assert_eq!(result, CallbackResult::Requeue);
    }

    #[tokio::test]
    async fn test_typed_callback_reports_bad_body() {
        let callback = TypedCallback::new(ResizeHandler::default());
        let meta = TaskMeta::new(Utc::now());

        let err = callback
            .call(&json!({"width": "wide"}), &meta, "img-3")
            .await
            .unwrap_err();
        assert!(err.message().contains("img-3"));
        assert!(callback.handler().seen.lock().unwrap().is_empty());
    }
}
