//! CalPilot calendar tool server
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout. Logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use calpilot_core::CredentialProvider;
use calpilot_infra::{
    config, init_logging, CalendarTools, GoogleCalendarApi, HttpClient, OAuthCredentialRelay,
    StaticTokenProvider, ToolServer,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_logging(&config.logging);

    // A token handed down by the assistant takes precedence over the local files
    let credentials: Arc<dyn CredentialProvider> = match StaticTokenProvider::from_env() {
        Some(provider) => {
            info!("Using forwarded access token");
            Arc::new(provider)
        }
        None => {
            info!(token_path = %config.google.token_path, "Using stored OAuth credentials");
            Arc::new(OAuthCredentialRelay::from_config(&config.google)?)
        }
    };

    let http = HttpClient::new().context("failed to build HTTP client")?;
    let api = GoogleCalendarApi::new(http, credentials, &config.google);

    info!(calendar_id = %config.google.calendar_id, "Calendar tool server ready");
    ToolServer::new(CalendarTools::new(api)).serve_stdio().await?;
    info!("Calendar tool server stopped");
    Ok(())
}
