//! Process shutdown signals

use std::future::Future;
use tracing::{error, info};

/// Resolve once `signal` fires. A handler that failed to install never
/// resolves, so it cannot stop the server on its own.
pub async fn await_signal<F>(signal: F, source: &str)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!(source, "Shutdown signal received"),
        Err(e) => {
            error!(error = %e, source, "Failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for Ctrl-C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = await_signal(tokio::signal::ctrl_c(), "ctrl_c");

    #[cfg(unix)]
    let terminate = await_signal(
        async {
            let mut sig =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
            sig.recv().await;
            Ok::<_, std::io::Error>(())
        },
        "sigterm",
    );

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
