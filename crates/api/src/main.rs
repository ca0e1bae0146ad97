//! CalPilot - natural-language calendar assistant
//!
//! HTTP entry point serving `POST /assistant/query`.

use std::sync::Arc;

use anyhow::Context;
use calpilot_api::{router, AppContext};
use calpilot_infra::{config, init_logging};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading configuration; report once logging is up
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_logging(&config.logging);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => warn!(error = %e, "Could not load .env file"),
    }

    let bind_addr = config.server.bind_addr.clone();
    let context = Arc::new(AppContext::new(config).context("failed to wire application")?);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "CalPilot listening");

    axum::serve(listener, router(context))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("CalPilot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
