// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination.
//!
//! A background task waits for SIGTERM or SIGINT and cancels a
//! [`CancellationToken`] the gateway server watches, so in-flight requests
//! drain before the process exits.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Resolves when a shutdown signal arrives, naming the signal.
async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}

/// Installs the signal handler task and returns the token it will cancel.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler = token.clone();

    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        info!(signal, "shutdown signal received, draining");
        handler.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_returns_an_uncancelled_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
    }
}
