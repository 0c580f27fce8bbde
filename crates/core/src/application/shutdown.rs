// Cooperative Shutdown Token
// Cancellation is honored at window boundaries only: a forced stop discards
// the current window's partial results, which re-run on restart.

use std::sync::Arc;

use tokio::sync::watch;

/// Shutdown signal for graceful termination
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
    // Inert tokens own their sender so the channel never closes;
    // channel tokens borrow liveness from the ShutdownSender.
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        let _ = self.rx.changed().await;
    }

    /// A token that never fires (for tests and non-interactive runs)
    pub fn inert() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to the executor
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (
        ShutdownSender { tx },
        ShutdownToken {
            rx,
            _keepalive: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_signals_all_clones() {
        let (sender, token) = shutdown_channel();
        let clone = token.clone();
        assert!(!token.is_shutdown());
        assert!(!clone.is_shutdown());

        sender.shutdown();
        assert!(token.is_shutdown());
        assert!(clone.is_shutdown());
    }

    #[test]
    fn test_inert_token_stays_unset_across_clones() {
        let token = ShutdownToken::inert();
        let clone = token.clone();
        drop(token);
        assert!(!clone.is_shutdown());
    }
}
