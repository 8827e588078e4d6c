// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Waiting for a shutdown signal.

use crate::error::{Result, ResultExt};

/// Block until Ctrl+C or SIGTERM arrives.
///
/// Plugins run their own threads, so the host only needs a small
/// current-thread runtime for signal delivery.
pub fn wait_for_shutdown() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("signal runtime")?;

    runtime.block_on(shutdown_signal());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, draining plugins");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, draining plugins");
        }
    }
}
