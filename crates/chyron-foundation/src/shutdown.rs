use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cooperative shutdown signal shared between the inference loop, the
/// silence timer, and the owning application. `shutdown()` is idempotent and
/// safe to call from any task; everything waiting on `wait()` wakes exactly
/// once per call.
#[derive(Clone)]
pub struct ShutdownHandler {
    inner: Arc<Inner>,
}

struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        self.inner.flag.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Resolves once `shutdown()` has been called. Safe to poll repeatedly;
    /// a caller that misses a notification still sees the flag set.
    pub async fn wait(&self) {
        if self.is_shutdown() {
            return;
        }
        self.inner.notify.notified().await;
    }

    /// Spawns a task that calls `shutdown()` on Ctrl-C. Returns the join
    /// handle so the caller can abort it during teardown.
    pub fn spawn_ctrl_c_listener(&self) -> tokio::task::JoinHandle<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received ctrl-c, shutting down");
                handler.shutdown();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_resolves_after_shutdown() {
        let handler = ShutdownHandler::new();
        let waiter = handler.clone();
        let task = tokio::spawn(async move {
            waiter.wait().await;
        });
        handler.shutdown();
        task.await.unwrap();
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn wait_returns_immediately_if_already_shutdown() {
        let handler = ShutdownHandler::new();
        handler.shutdown();
        handler.wait().await;
    }
}
