use std::marker::PhantomData;

use async_trait::async_trait;

use crate::domain::{CallbackError, CallbackResult, TaskMeta};

/// The user's side of the consume loop.
///
/// Called once per delivery with the envelope's body, its metadata *before* this
/// delivery is counted, and its name.
#[async_trait]
pub trait TaskCallback: Send + Sync {
    async fn call(
        &self,
        body: &serde_json::Value,
        meta: &TaskMeta,
        name: &str,
    ) -> Result<CallbackResult, CallbackError>;
}

#[async_trait]
impl<C: TaskCallback + ?Sized> TaskCallback for std::sync::Arc<C> {
    async fn call(
        &self,
        body: &serde_json::Value,
        meta: &TaskMeta,
        name: &str,
    ) -> Result<CallbackResult, CallbackError> {
        (**self).call(body, meta, name).await
    }
}

/// Adapter for plain (synchronous) closures; see [`callback_fn`].
pub struct FnCallback<F, R> {
    f: F,
    _result: PhantomData<fn() -> R>,
}

/// Wrap a closure as a [`TaskCallback`].
///
/// The closure may return anything convertible into a [`CallbackResult`]: the result
/// itself, an integer code, `()` or `Option<CallbackResult>`.
///
/// ```ignore
/// let cb = callback_fn(|body, _meta, name| {
///     println!("{name}: {body}");
///     Ok::<_, CallbackError>(CallbackResult::Ack)
/// });
/// ```
pub fn callback_fn<F, R>(f: F) -> FnCallback<F, R>
where
    F: Fn(&serde_json::Value, &TaskMeta, &str) -> Result<R, CallbackError> + Send + Sync,
    R: Into<CallbackResult> + Send,
{
    FnCallback {
        f,
        _result: PhantomData,
    }
}

#[async_trait]
impl<F, R> TaskCallback for FnCallback<F, R>
where
    F: Fn(&serde_json::Value, &TaskMeta, &str) -> Result<R, CallbackError> + Send + Sync,
    R: Into<CallbackResult> + Send,
{
    async fn call(
        &self,
        body: &serde_json::Value,
        meta: &TaskMeta,
        name: &str,
    ) -> Result<CallbackResult, CallbackError> {
        (self.f)(body, meta, name).map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn closures_returning_codes_are_mapped() {
        let meta = TaskMeta::new(Utc::now());
        let requeue = callback_fn(|_, _, _| Ok::<_, CallbackError>(1i64));
        let unknown = callback_fn(|_, _, _| Ok::<_, CallbackError>(42i64));
        let unit = callback_fn(|_, _, _| Ok::<_, CallbackError>(()));

        assert_eq!(
            requeue.call(&json!(null), &meta, "t").await.unwrap(),
            CallbackResult::Requeue
        );
        assert_eq!(
            unknown.call(&json!(null), &meta, "t").await.unwrap(),
            CallbackResult::Ack
        );
        assert_eq!(
            unit.call(&json!(null), &meta, "t").await.unwrap(),
            CallbackResult::Ack
        );
    }

    #[tokio::test]
    async fn closure_sees_body_and_name() {
        let meta = TaskMeta::new(Utc::now());
        let cb = callback_fn(|body, meta, name| {
            assert_eq!(body, &json!({"k": "v"}));
            assert_eq!(meta.delivery_count(), 0);
            assert_eq!(name, "named");
            Ok::<_, CallbackError>(CallbackResult::Stop)
        });
        let result = cb.call(&json!({"k": "v"}), &meta, "named").await.unwrap();
        assert_eq!(result, CallbackResult::Stop);
    }
}
