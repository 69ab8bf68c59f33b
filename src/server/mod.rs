//! HTTP relay between the chat client and the workflow webhook.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;

use crate::config::Config;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config);
    if !state.webhook.is_configured() {
        warn!(
            "{} is not set; chat requests will fail until it is configured",
            crate::config::WEBHOOK_URL_ENV
        );
    }

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("cannot bind relay to {}", config.bind_addr))?;
    info!(addr = %listener.local_addr()?, "relay listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server failed")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down relay");
}
