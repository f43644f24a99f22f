//! Delayed task utilities
//!
//! Provides a cancellable one-shot callback scheduled on the tokio runtime.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A callback that runs once after a delay unless cancelled first.
///
/// Dropping the timer cancels it as well, so replacing a stored timer never
/// lets the old callback fire.
pub struct SettleTimer {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl SettleTimer {
    /// Schedule `on_fire` to run after `delay`
    pub fn schedule<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => on_fire(),
                // Fires on explicit cancel and on drop of the sender
                _ = cancel_rx => {}
            }
        });

        Self {
            cancel: Some(cancel_tx),
            handle,
        }
    }

    /// Whether the callback already ran or the timer was cancelled
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the timer.
    ///
    /// Returns false if the callback had already run.
    pub fn cancel(mut self) -> bool {
        let pending = !self.is_finished();
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = SettleTimer::schedule(Duration::from_millis(1800), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1799)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timer.is_finished());
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = SettleTimer::schedule(Duration::from_millis(500), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(timer.cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        drop(SettleTimer::schedule(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
