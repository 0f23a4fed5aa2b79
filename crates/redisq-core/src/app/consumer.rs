//! Consumer - blocking pop → callback → requeue / discard / stop
//!
//! # フロー（1 iteration）
//! 1. ListStore::blocking_head_pop（timeout 付き）。何も来なければ 5 へ
//! 2. EnvelopeCodec で decode。失敗したら warn ログを出して skip
//! 3. callback 実行 → CallbackResult
//! 4. delivery を +1 し、結果で分岐
//!    - Ack: 何もしない（pop 済み）
//!    - Requeue: delivery < max_delivery なら retry を +1 して tail に push、そうでなければ破棄
//!    - Stop: StopRequested へ
//! 5. Shutdown を確認（停止要求が効くのはここだけ）
//!
//! pop は停止要求と競合させません。pop 済みの item が store にも callback にも
//! 無い瞬間を作らないためです。

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::callback::TaskCallback;
use super::shutdown::Shutdown;
use crate::config::{CallbackErrorPolicy, QueueConfig};
use crate::domain::{
    CallbackResult, ConsumeError, ConsumerState, CorruptEnvelopeError, StopCause, TaskEnvelope,
};
use crate::ports::{EnvelopeCodec, JsonCodec, ListStore};

/// What one `consume` run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumeReport {
    /// Envelopes handed to the callback.
    pub delivered: usize,
    pub acked: usize,
    pub requeued: usize,
    /// Requeue requested at the delivery ceiling.
    pub discarded: usize,
    /// Popped items that failed to decode.
    pub corrupt: usize,
    /// Callback failures treated as Ack. Not included in `acked`.
    pub callback_errors: usize,
    pub stop_cause: Option<StopCause>,
}

/// Single consumer for one queue key.
pub struct Consumer<S, K = JsonCodec> {
    store: S,
    codec: K,
    config: QueueConfig,
    shutdown: Shutdown,
}

impl<S: ListStore> Consumer<S, JsonCodec> {
    pub fn new(store: S, config: QueueConfig) -> Self {
        Self {
            store,
            codec: JsonCodec,
            config,
            shutdown: Shutdown::new(),
        }
    }
}

impl<S: ListStore, K: EnvelopeCodec> Consumer<S, K> {
    pub fn with_codec<K2: EnvelopeCodec>(self, codec: K2) -> Consumer<S, K2> {
        Consumer {
            store: self.store,
            codec,
            config: self.config,
            shutdown: self.shutdown,
        }
    }

    /// Share an existing stop handle (e.g. one wired to OS signals).
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the loop until the callback returns `Stop` or a stop is requested.
    ///
    /// Store errors and (with [`CallbackErrorPolicy::Propagate`]) callback errors end the
    /// loop and are returned; restart/backoff is up to the caller. An invalid config is
    /// rejected with [`ConsumeError::Config`] before the first pop.
    #[tracing::instrument(skip_all, fields(queue_key = %self.config.queue_key()))]
    pub async fn consume<C>(&self, callback: &C) -> Result<ConsumeReport, ConsumeError>
    where
        C: TaskCallback + ?Sized,
    {
        self.config
            .validate()
            .inspect_err(|e| error!(error = %e, "invalid queue config, not consuming"))?;

        info!(
            max_delivery = self.config.max_delivery(),
            timeout_ms = self.config.timeout().as_millis() as u64,
            "consume loop started"
        );

        let mut report = ConsumeReport::default();
        let mut state = ConsumerState::Running
            .after_shutdown_check(self.shutdown.is_stop_requested())
            .end_iteration();

        while state.can_pop() {
            let popped = self
                .store
                .blocking_head_pop(self.config.queue_key(), self.config.timeout())
                .await
                .inspect_err(|e| error!(error = %e, "blocking pop failed, leaving consume loop"))?;

            match popped {
                Some(raw) => {
                    if let Some(result) = self.handle_item(raw, callback, &mut report).await? {
                        state = state.after_result(result);
                    }
                }
                None => debug!("no task within timeout"),
            }

            // 停止要求の確認は 1 iteration に 1 回だけ
            state = state
                .after_shutdown_check(self.shutdown.is_stop_requested())
                .end_iteration();
        }

        report.stop_cause = self.shutdown.cause();
        match &report.stop_cause {
            Some(cause) => info!(%cause, ?report, "consume loop stopped"),
            None => info!(?report, "consume loop stopped"),
        }
        Ok(report)
    }

    /// Process one popped item. Returns `None` when the item was skipped as corrupt.
    async fn handle_item<C>(
        &self,
        raw: Vec<u8>,
        callback: &C,
        report: &mut ConsumeReport,
    ) -> Result<Option<CallbackResult>, ConsumeError>
    where
        C: TaskCallback + ?Sized,
    {
        let mut envelope = match self.codec.decode(&raw) {
            Ok(envelope) => envelope,
            Err(source) => {
                let err = CorruptEnvelopeError { raw, source };
                warn!(raw = %err.raw_lossy(), error = %err, "discarding corrupt envelope");
                report.corrupt += 1;
                return Ok(None);
            }
        };

        info!(
            task = envelope.name(),
            delivery = envelope.meta().delivery_count() + 1,
            retry = envelope.meta().retry_count(),
            "task received"
        );

        let outcome = callback
            .call(envelope.body(), envelope.meta(), envelope.name())
            .await;

        // 結果に関係なく delivery は必ず +1
        let delivery = envelope.meta_mut().record_delivery();
        report.delivered += 1;

        // failed は callback_errors にだけ数え、acked には入れない
        let (result, failed) = match outcome {
            Ok(result) => (result, false),
            Err(err) => match self.config.callback_error_policy() {
                CallbackErrorPolicy::Ack => {
                    error!(task = envelope.name(), error = %err, "callback failed, treating as ack");
                    report.callback_errors += 1;
                    (CallbackResult::Ack, true)
                }
                CallbackErrorPolicy::Propagate => {
                    error!(
                        envelope = %dump(&envelope),
                        error = %err,
                        "callback failed, leaving consume loop"
                    );
                    return Err(err.into());
                }
            },
        };

        info!(task = envelope.name(), ?result, delivery, "callback finished");

        match result {
            CallbackResult::Ack if failed => {}
            CallbackResult::Ack => report.acked += 1,
            CallbackResult::Requeue if delivery < self.config.max_delivery() => {
                envelope.meta_mut().record_retry();
                self.requeue(&envelope).await?;
                report.requeued += 1;
            }
            CallbackResult::Requeue => {
                warn!(
                    max_delivery = self.config.max_delivery(),
                    envelope = %dump(&envelope),
                    "max delivery reached, discarding task"
                );
                report.discarded += 1;
            }
            CallbackResult::Stop => {
                info!(task = envelope.name(), "callback requested stop");
                self.shutdown.request_stop(StopCause::Callback {
                    task_name: envelope.name().to_string(),
                });
            }
        }

        Ok(Some(result))
    }

    async fn requeue(&self, envelope: &TaskEnvelope) -> Result<(), ConsumeError> {
        let raw = self.codec.encode(envelope).inspect_err(|e| {
            error!(envelope = %dump(envelope), error = %e, "failed to encode task for requeue");
        })?;

        self.store
            .tail_push(self.config.queue_key(), raw)
            .await
            .inspect_err(|e| {
                error!(envelope = %dump(envelope), error = %e, "failed to requeue task");
            })?;

        info!(
            task = envelope.name(),
            retry = envelope.meta().retry_count(),
            "task requeued"
        );
        Ok(())
    }
}

/// Full envelope as JSON for forensic logs.
fn dump(envelope: &TaskEnvelope) -> String {
    serde_json::to_string(envelope).unwrap_or_else(|_| format!("{envelope:?}"))
}
