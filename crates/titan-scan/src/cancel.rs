//! # Cancellation Token
//!
//! Cooperative cancellation for an in-flight camera acquisition.
//!
//! ```text
//!   stop()                                acquire()
//!   ──────                                ─────────
//!   token.cancel() ───── watch ─────►  select! { spawned engine.start(),
//!                                               cancelled() }
//!   acquisition lock  ◄── released ──  cancelled: hand the start task to a
//!   engine.stop()                       teardown task and report nothing
//!
//!   teardown task: start resolves late ──► engine.stop()
//!   next acquire(): waits for pending teardown before its first start
//! ```
//!
//! One token per acquisition. A fresh start replaces it, so a cancelled
//! token never leaks into the next session.

use tokio::sync::watch;

/// Cloneable cancel flag backed by a `watch` channel.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        CancelToken {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    /// Signals cancellation to every clone. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone, so this only errors if
        // every token was dropped, which cannot happen while we hold one.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            waiter.is_cancelled()
        });

        tokio::task::yield_now().await;
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(handle.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncancelled_token_keeps_waiting() {
        let token = CancelToken::new();
        let result = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancel_before_wait() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        token.cancelled().await;
    }
}
