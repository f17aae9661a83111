use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// A spawned background loop with cooperative cancellation.
///
/// The loop receives a [`CancellationToken`] and must return promptly once it
/// fires. [`TaskHandle::stop`] cancels and then waits for the loop to finish,
/// so resources the loop owns are released by the time it returns.
pub struct TaskHandle {
    name: &'static str,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(body(cancel.clone()));
        debug!(task = name, "background task spawned");
        Self { name, cancel, join }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True once the loop has returned, whether cancelled or on its own.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel and wait for the loop to acknowledge by returning.
    pub async fn stop(self) {
        self.cancel.cancel();
        match self.join.await {
            Ok(()) => debug!(task = self.name, "background task stopped"),
            Err(e) if e.is_panic() => error!(task = self.name, "background task panicked"),
            Err(_) => debug!(task = self.name, "background task aborted"),
        }
    }
}
