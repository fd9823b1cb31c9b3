//! HTTP surfaces for the PDF gallery
//!
//! Exposes preview rendering, remote image processing and PDF export as an
//! axum router over a shared [`AppState`].

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::{PresetInfo, SKIPPED_ENTRIES_HEADER, router};
pub use state::AppState;

use std::net::SocketAddr;

/// Serve the gallery API until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Gallery server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
