//! OS signal wiring for the shutdown signal.

use std::future::Future;
use std::io;

use tokio::signal;
use tracing::{info, warn};

use crate::application::shutdown::{ShutdownReason, ShutdownSignal};

/// Fire `shutdown` on Ctrl+C or SIGTERM. Must be called inside a tokio runtime.
pub fn listen(shutdown: &ShutdownSignal) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            reason = os_signal() => {
                info!(?reason, "Shutdown signal received");
                shutdown.trigger(reason);
            }
            () = shutdown.triggered() => {}
        }
    });
}

#[cfg(unix)]
async fn os_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut term) => tokio::select! {
            () = interrupt() => ShutdownReason::Interrupt,
            _ = term.recv() => ShutdownReason::Terminate,
        },
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            interrupt().await;
            ShutdownReason::Interrupt
        }
    }
}

#[cfg(not(unix))]
async fn os_signal() -> ShutdownReason {
    interrupt().await;
    ShutdownReason::Interrupt
}

/// Resolve on Ctrl+C. Never resolves if the handler cannot be installed.
async fn interrupt() {
    until_delivered(signal::ctrl_c(), "Ctrl+C").await;
}

async fn until_delivered<F>(listener: F, name: &str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = listener.await {
        warn!(error = %e, signal = name, "Failed to listen for signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn failed_listener_never_reports_a_signal() {
        let waited = tokio::time::timeout(
            Duration::from_secs(60),
            until_delivered(async { Err(io::Error::other("no signal driver")) }, "Ctrl+C"),
        )
        .await;

        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn delivered_signal_resolves() {
        until_delivered(async { Ok(()) }, "Ctrl+C").await;
    }
}
