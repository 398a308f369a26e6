//! Calmate - conversational Outlook calendar assistant
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use anyhow::Context;
use calmate_lib::utils::logging::init_tracing;
use calmate_lib::{build_router, AppContext};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG and CALMATE_LOG_FORMAT from it apply
    let dotenv = dotenvy::dotenv();
    init_tracing();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => warn!("Could not load .env file: {e}"),
    }

    let config = calmate_infra::config::load().context("failed to load configuration")?;
    let bind_address = config.server.bind_address.clone();

    let ctx = Arc::new(AppContext::new(config).context("failed to initialise application")?);
    let app = build_router(ctx);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!(address = %bind_address, "Calmate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Calmate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
