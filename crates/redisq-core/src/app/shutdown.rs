//! Shutdown - 協調的な停止要求
//!
//! consume ループは 1 iteration に 1 回だけ停止要求を確認します。
//! callback の実行中に割り込むことはありません。
//! OS signal の登録は [`Shutdown::listen_for_signals`] が行い、
//! 同じ handle を叩くだけです。

use std::sync::Arc;
use std::task::Poll;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::StopCause;

/// Cloneable stop handle.
///
/// The first recorded cause wins; later requests are ignored.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<StopCause>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Ask the consume loop to stop at its next iteration boundary.
    /// Returns `false` if a stop had already been requested.
    pub fn request_stop(&self, cause: StopCause) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(cause);
            true
        })
    }

    pub fn is_stop_requested(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn cause(&self) -> Option<StopCause> {
        self.tx.borrow().clone()
    }

    /// Wait until a stop is requested.
    pub async fn wait(&self) -> StopCause {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(cause) => (*cause).clone().unwrap_or(StopCause::Requested),
            // sender は self が保持しているので到達しない
            Err(_) => StopCause::Requested,
        }
    }

    /// Spawn a task that turns SIGINT, SIGHUP, SIGQUIT and SIGTERM (Ctrl-C off Unix)
    /// into a stop request. Best-effort: if no handler can be installed the task just
    /// waits for some other stop request.
    ///
    /// The handlers stay installed for the life of the process, so a second signal
    /// after the first one exits the process with status 130 (a callback that never
    /// returns can still be interrupted).
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        self.listen_for_signals_with(|name| {
            warn!(signal = name, "received second signal, exiting immediately");
            std::process::exit(130);
        })
    }

    /// Same as [`Shutdown::listen_for_signals`], but every signal after the first one
    /// calls `on_repeat` instead of exiting the process.
    ///
    /// The task ends without waiting for signals if a stop is requested by other means
    /// before any signal arrives.
    pub fn listen_for_signals_with<F>(&self, on_repeat: F) -> JoinHandle<()>
    where
        F: Fn(&'static str) + Send + 'static,
    {
        let shutdown = self.clone();
        tokio::spawn(async move {
            let Some(mut signals) = Signals::install() else {
                shutdown.wait().await;
                return;
            };

            tokio::select! {
                name = signals.recv() => {
                    info!(signal = name, "received signal, stopping after current task");
                    shutdown.request_stop(StopCause::Signal(name.to_string()));
                }
                _ = shutdown.wait() => return,
            }

            loop {
                let name = signals.recv().await;
                on_repeat(name);
            }
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
struct Signals {
    streams: Vec<(&'static str, tokio::signal::unix::Signal)>,
}

#[cfg(unix)]
impl Signals {
    fn install() -> Option<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let kinds = [
            (SignalKind::interrupt(), "SIGINT"),
            (SignalKind::hangup(), "SIGHUP"),
            (SignalKind::quit(), "SIGQUIT"),
            (SignalKind::terminate(), "SIGTERM"),
        ];

        let mut streams = Vec::with_capacity(kinds.len());
        for (kind, name) in kinds {
            match signal(kind) {
                Ok(stream) => streams.push((name, stream)),
                Err(e) => warn!(signal = name, error = %e, "failed to install signal handler"),
            }
        }

        if streams.is_empty() {
            None
        } else {
            Some(Self { streams })
        }
    }

    async fn recv(&mut self) -> &'static str {
        std::future::poll_fn(|cx| {
            for (name, stream) in self.streams.iter_mut() {
                if let Poll::Ready(Some(())) = stream.poll_recv(cx) {
                    return Poll::Ready(*name);
                }
            }
            Poll::Pending
        })
        .await
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> Option<Self> {
        Some(Self)
    }

    async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "CTRL_C",
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending().await
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::signal_testing::SIGNAL_LOCK;
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_cause_wins() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_stop_requested());

        assert!(shutdown.request_stop(StopCause::Signal("SIGTERM".into())));
        assert!(!shutdown.request_stop(StopCause::Requested));

        assert!(shutdown.is_stop_requested());
        assert_eq!(shutdown.cause(), Some(StopCause::Signal("SIGTERM".into())));
    }

    #[test]
    fn clones_share_the_flag() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        other.request_stop(StopCause::Requested);
        assert!(shutdown.is_stop_requested());
    }

    #[tokio::test]
    async fn wait_returns_after_request() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.wait().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.request_stop(StopCause::Requested);

        let cause = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cause, StopCause::Requested);
    }

    #[tokio::test]
    async fn signal_listener_exits_on_other_stop() {
        let _guard = SIGNAL_LOCK.lock().await;
        let shutdown = Shutdown::new();
        let listener = shutdown.listen_for_signals_with(|_| {});
        shutdown.request_stop(StopCause::Requested);

        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shutdown.cause(), Some(StopCause::Requested));
    }

    #[cfg(unix)]
    async fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let polled = async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        if tokio::time::timeout(Duration::from_secs(2), polled).await.is_err() {
            panic!("timed out waiting for {what}");
        }
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn second_signal_escalates_instead_of_being_swallowed() {
        use super::signal_testing::raise;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::signal::unix::{SignalKind, signal};

        let _guard = SIGNAL_LOCK.lock().await;
        // プロセス側の handler を先に入れておく（SIGHUP の既定動作で落ちないように）
        let _installed = signal(SignalKind::hangup()).unwrap();

        let shutdown = Shutdown::new();
        let repeats = Arc::new(AtomicUsize::new(0));
        let listener = shutdown.listen_for_signals_with({
            let repeats = repeats.clone();
            move |_| {
                repeats.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        raise("-HUP");
        wait_until("first SIGHUP", || shutdown.is_stop_requested()).await;
        assert_eq!(shutdown.cause(), Some(StopCause::Signal("SIGHUP".into())));
        assert_eq!(repeats.load(Ordering::SeqCst), 0);

        raise("-HUP");
        wait_until("second SIGHUP", || repeats.load(Ordering::SeqCst) == 1).await;
        // 2 回目は停止理由を上書きしない
        assert_eq!(shutdown.cause(), Some(StopCause::Signal("SIGHUP".into())));
        assert!(!listener.is_finished());
        listener.abort();
    }
}
