//! Process shutdown signal.

use tracing::{info, warn};

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
///
/// Pass to `axum::serve(..).with_graceful_shutdown` or await directly, then
/// call [`Logger::shutdown`](crate::Logger::shutdown).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(subsystem = "lifecycle", error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(subsystem = "lifecycle", error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(subsystem = "lifecycle", "Received Ctrl-C, shutting down"),
        _ = terminate => info!(subsystem = "lifecycle", "Received SIGTERM, shutting down"),
    }
}
