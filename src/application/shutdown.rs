//! Process-wide shutdown signal.
//!
//! A single `watch` channel flipped to `true` by an OS signal or an overall
//! deadline. Pollers use it as their parent cancellation signal and the
//! lifecycle manager's cleanup hook waits on it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

/// Why the process is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    Deadline,
    Requested,
}

/// Cloneable trigger plus receiver factory for the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
    reason: Arc<parking_lot::Mutex<Option<ShutdownReason>>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            reason: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// Receiver that observes the signal; already `true` if it fired.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Fire the signal. Only the first reason is kept.
    pub fn trigger(&self, reason: ShutdownReason) {
        {
            let mut current = self.reason.lock();
            if current.is_none() {
                *current = Some(reason);
            }
        }
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.reason.lock()
    }

    /// Resolve once the signal has fired.
    pub async fn triggered(&self) {
        wait_triggered(&mut self.subscribe()).await;
    }

    /// Fire with [`ShutdownReason::Deadline`] after `after` elapses.
    pub fn arm_deadline(&self, after: Duration) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(after) => {
                    warn!(deadline = ?after, "Overall deadline reached");
                    this.trigger(ShutdownReason::Deadline);
                }
                () = this.triggered() => {}
            }
        });
    }
}

/// Wait until `rx` observes `true`. Never resolves if the sender is dropped
/// without firing.
pub async fn wait_triggered(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|fired| *fired).await.is_err() {
        std::future::pending::<()>().await;
    }
}
