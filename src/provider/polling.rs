//! Background polling task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::ReloadEngine;
use super::Notifier;

/// Handle to a running polling task.
///
/// The task sleeps for the interval, reloads, and repeats until its token is
/// cancelled. Failed reloads are reported and retried on the next tick.
#[derive(Debug)]
pub struct PollerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub(crate) fn spawn(
        engine: Arc<ReloadEngine>,
        interval: Duration,
        token: CancellationToken,
        notifier: Notifier,
    ) -> Self {
        let task = tokio::spawn(poll(engine, interval, token.clone(), notifier));
        Self { token, task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the task to stop and wait until it has.
    pub async fn shutdown(self) {
        self.token.cancel();
        // A panicking reload already surfaced through the panic hook.
        let _ = self.task.await;
    }
}

async fn poll(
    engine: Arc<ReloadEngine>,
    interval: Duration,
    token: CancellationToken,
    notifier: Notifier,
) {
    notifier.emit(|o| o.polling_started(interval));

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        match engine.reload(&token).await {
            Ok(_) => {}
            Err(err) if err.is_cancelled() => break,
            Err(err) => notifier.emit(|o| o.polling_error(&err, interval)),
        }
    }

    notifier.emit(|o| o.polling_stopped());
}
