//! Application context - dependency injection container

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use calpilot_core::{
    AssistantPipeline, CheckpointStore, CredentialProvider, GenerationCapability,
    InMemoryCheckpointStore, SessionOpener, StageRunner, ToolClientOptions,
};
use calpilot_domain::{Config, Result};
use calpilot_infra::{GeminiClient, OAuthCredentialRelay, StdioSessionOpener};
use tracing::info;

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Everything a request handler needs, built once at startup.
pub struct AppContext {
    pub config: Config,
    pub pipeline: AssistantPipeline,
    pub checkpoints: Arc<InMemoryCheckpointStore>,
}

impl AppContext {
    /// Wire the production adapters: Gemini for generation, the stdio tool
    /// server for calendar operations, the OAuth relay for tokens.
    pub fn new(config: Config) -> Result<Self> {
        let capability: Arc<dyn GenerationCapability> =
            Arc::new(GeminiClient::from_config(&config.gemini)?);

        let credentials: Option<Arc<dyn CredentialProvider>> = if config.tools.forward_access_token
        {
            Some(Arc::new(OAuthCredentialRelay::from_config(&config.google)?))
        } else {
            None
        };
        let opener: Arc<dyn SessionOpener> =
            Arc::new(StdioSessionOpener::new(config.tools.clone(), credentials));

        info!(
            model = %config.gemini.model,
            tool_command = %config.tools.command,
            forward_access_token = config.tools.forward_access_token,
            "Application context wired"
        );
        Ok(Self::from_parts(config, capability, opener))
    }

    /// Build a context around caller-supplied adapters.
    pub fn from_parts(
        config: Config,
        capability: Arc<dyn GenerationCapability>,
        opener: Arc<dyn SessionOpener>,
    ) -> Self {
        let tool_options =
            ToolClientOptions { call_timeout: Duration::from_secs(config.tools.call_timeout_secs) };
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let store: Arc<dyn CheckpointStore> = checkpoints.clone();
        let pipeline = AssistantPipeline::new(StageRunner::new(capability, opener, tool_options), store);

        Self { config, pipeline, checkpoints }
    }

    /// Report on the wired components. Nothing remote is contacted.
    pub async fn health_check(&self) -> HealthStatus {
        let mut status = HealthStatus::new()
            .add_component(ComponentHealth::healthy_with("generation", &self.config.gemini.model))
            .add_component(self.tool_server_health())
            .add_component(self.credentials_health().await)
            .add_component(ComponentHealth::healthy_with(
                "checkpoints",
                format!("{} requests in flight", self.checkpoints.len()),
            ));
        status.calculate_score();
        status
    }

    fn tool_server_health(&self) -> ComponentHealth {
        if self.config.tools.command.trim().is_empty() {
            ComponentHealth::unhealthy("tool_server", "no tool server command configured")
        } else {
            ComponentHealth::healthy_with("tool_server", &self.config.tools.command)
        }
    }

    async fn credentials_health(&self) -> ComponentHealth {
        if !self.config.tools.forward_access_token {
            return ComponentHealth::healthy_with(
                "google_credentials",
                "managed by the tool server",
            );
        }
        for file in [&self.config.google.credentials_path, &self.config.google.token_path] {
            if !file_exists(file).await {
                return ComponentHealth::unhealthy("google_credentials", format!("{file} not found"));
            }
        }
        ComponentHealth::healthy("google_credentials")
    }
}

async fn file_exists(path: impl AsRef<Path>) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
