//! Stop signal shared by every long-running loop
//!
//! Blocking loops poll `ShutdownSignal::is_triggered` once per iteration;
//! async loops race `ShutdownSignal::wait` against their work.

use std::sync::Arc;

use tokio::sync::watch;

/// Owner side: triggers shutdown
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal every listener to stop
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Create a listener
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener side
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Non-blocking check
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is triggered (or the owner is gone)
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[test]
    fn test_trigger_reaches_all_signals() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.signal();
        let b = shutdown.signal();

        {
            let mut wait = task::spawn(a.wait());
            assert_pending!(wait.poll());
            shutdown.trigger();
            assert!(wait.is_woken());
            assert_ready!(wait.poll());
        }

        assert!(a.is_triggered());
        assert!(b.is_triggered());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_signal_created_after_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut late = shutdown.signal();
        late.wait().await;
        assert!(late.is_triggered());
    }

    #[tokio::test]
    async fn test_owner_dropped() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.signal();
        drop(shutdown);

        // Returns instead of hanging forever
        signal.wait().await;
        assert!(!signal.is_triggered());
    }
}
