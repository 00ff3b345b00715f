//! Shutdown coordinator.
//!
//! Listens for SIGINT (Ctrl+C), SIGTERM and SIGHUP, then cancels a
//! [`tokio_util::sync::CancellationToken`] so the walk stops at its next
//! await point. A second signal force-exits.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

/// Exit status for a run stopped by a signal.
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Install signal handlers and return a [`CancellationToken`] that is
/// cancelled on the first signal. The handler task logs through the
/// subscriber that is current when this is called.
pub(crate) fn install_signal_handler() -> anyhow::Result<CancellationToken> {
    let token = CancellationToken::new();
    let count = Arc::new(AtomicU32::new(0));

    #[cfg(unix)]
    let (mut sigterm, mut sighup) = {
        use tokio::signal::unix::{signal, SignalKind};
        (
            signal(SignalKind::terminate())?,
            signal(SignalKind::hangup())?,
        )
    };

    let handler_token = token.clone();
    tokio::spawn(
        async move {
            loop {
                #[cfg(unix)]
                {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                        _ = sighup.recv() => {}
                    }
                }

                #[cfg(not(unix))]
                {
                    if tokio::signal::ctrl_c().await.is_err() {
                        tracing::warn!("Could not listen for Ctrl+C");
                        return;
                    }
                }

                let prev = count.fetch_add(1, Ordering::SeqCst);
                if prev == 0 {
                    tracing::warn!("Received shutdown signal, stopping after the current request...");
                    tracing::info!("Press Ctrl+C again to force exit");
                    handler_token.cancel();
                } else {
                    tracing::warn!("Force exit requested");
                    std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
                }
            }
        }
        .with_current_subscriber(),
    );

    Ok(token)
}
