use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// One-shot readiness flag that async waiters can block on.
///
/// Once signalled the gate stays open; every current and future waiter
/// proceeds.
#[derive(Debug, Clone, Default)]
pub struct ReadyGate {
    ready: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent signal is not lost.
            notified.as_mut().enable();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }

    /// Waits at most `timeout`. Returns whether the gate opened in time.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::ReadyGate;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn wait_blocks_until_signal() {
        let gate = ReadyGate::new();
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move {
                gate.wait().await;
            }
        });

        let early = timeout(Duration::from_millis(50), gate.wait()).await;
        assert!(early.is_err(), "wait should block before the signal");

        gate.signal();
        let result = timeout(Duration::from_millis(200), waiter).await;
        assert!(result.is_ok(), "wait should complete after the signal");
        result.unwrap().unwrap();
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_ready() {
        let gate = ReadyGate::new();
        gate.signal();

        assert!(gate.is_ready());
        assert!(gate.wait_timeout(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn wait_timeout_reports_false_when_never_signalled() {
        let gate = ReadyGate::new();
        assert!(!gate.wait_timeout(Duration::from_millis(30)).await);
        assert!(!gate.is_ready());
    }

    #[tokio::test]
    async fn all_waiters_are_released() {
        let gate = ReadyGate::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait_timeout(Duration::from_secs(1)).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.signal();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }
}
