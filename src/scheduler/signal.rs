//! One-shot "first refresh finished" signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Completes once, after the first successful refresh.
///
/// Callers that start before the queue is populated await [`wait`] instead
/// of reading an empty queue as "nothing due".
///
/// [`wait`]: RefreshSignal::wait
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl RefreshSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_completed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Mark completed. Later calls are no-ops.
    pub fn complete(&self) {
        self.tx.send_if_modified(|done| !std::mem::replace(done, true));
    }

    /// Resolve once the signal has completed.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot see a closed channel.
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_incomplete() {
        let signal = RefreshSignal::new();
        assert!(!signal.is_completed());
        signal.complete();
        signal.complete();
        assert!(signal.is_completed());
    }

    #[tokio::test]
    async fn test_wait_resolves_after_complete() {
        let signal = RefreshSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        signal.complete();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_completed() {
        let signal = RefreshSignal::new();
        signal.complete();
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("already completed");
    }
}
