use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::{ApiError, ApiRequest, RequestKind, SettingsApi};

/// Shared flag telling in-flight requests that nobody will read their outcome.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Completed {
    pub kind: RequestKind,
    pub outcome: Result<(), ApiError>,
}

/// Runs requests off the UI thread and hands their outcomes back through a channel.
///
/// Requests run to completion; cancelling only discards the outcome.
pub struct RequestWorker {
    api: Arc<dyn SettingsApi>,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
    token: CancellationToken,
}

impl RequestWorker {
    pub fn new(api: Arc<dyn SettingsApi>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            api,
            tx,
            rx,
            token: CancellationToken::new(),
        }
    }

    pub fn api(&self) -> &Arc<dyn SettingsApi> {
        &self.api
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn dispatch(&self, request: ApiRequest) {
        let kind = request.kind();
        if self.token.is_cancelled() {
            tracing::warn!(%kind, "worker cancelled, request not sent");
            return;
        }
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let token = self.token.clone();
        tracing::info!(%kind, "dispatching request");
        let spawned = thread::Builder::new()
            .name(format!("request-{kind}"))
            .spawn(move || {
                let outcome = request.execute(api.as_ref());
                if token.is_cancelled() {
                    tracing::debug!(%kind, ok = outcome.is_ok(), "discarding outcome after teardown");
                    return;
                }
                if tx.send(Completed { kind, outcome }).is_err() {
                    tracing::debug!(%kind, "outcome receiver dropped");
                }
            });
        if let Err(err) = spawned {
            tracing::error!(?err, %kind, "failed to spawn request thread");
            let outcome = Err(ApiError::Transport(format!("spawning request thread: {err}")));
            if self.tx.send(Completed { kind, outcome }).is_err() {
                tracing::debug!(%kind, "outcome receiver dropped");
            }
        }
    }

    /// Outcomes that arrived since the last poll.
    pub fn poll(&self) -> Vec<Completed> {
        if self.token.is_cancelled() {
            return Vec::new();
        }
        self.rx.try_iter().collect()
    }

    /// Blocks until one outcome arrives or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<Completed> {
        match self.rx.recv_timeout(timeout) {
            Ok(completed) => Some(completed),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl Drop for RequestWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;

    #[test]
    fn outcome_is_delivered_through_channel() {
        let api = Arc::new(ScriptedApi::default());
        api.push_outcome(Err(ApiError::remote(500, "disk full")));
        let worker = RequestWorker::new(api.clone());
        worker.dispatch(ApiRequest::BustCache);
        let completed = worker.wait(Duration::from_secs(5)).expect("outcome");
        assert_eq!(completed.kind, RequestKind::BustCache);
        let err = completed.outcome.expect_err("scripted failure");
        assert_eq!(err.to_save_error().display_message(), "disk full");
        assert_eq!(api.request_count(), 1);
    }

    #[test]
    fn cancelled_worker_sends_nothing() {
        let api = Arc::new(ScriptedApi::default());
        let worker = RequestWorker::new(api.clone());
        worker.token().cancel();
        worker.dispatch(ApiRequest::RemoveLicense);
        assert!(worker.poll().is_empty());
        assert_eq!(api.request_count(), 0);
    }

    #[test]
    fn cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
