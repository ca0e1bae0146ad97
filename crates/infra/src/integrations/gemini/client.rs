/// Gemini API client implementing the generation capability
use async_trait::async_trait;
use calpilot_core::GenerationCapability;
use calpilot_domain::{CalPilotError, GeminiConfig, Result};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

use super::types::{
    Content, GeminiError, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};

const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Gemini `generateContent` client
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client against the public endpoint.
    pub fn new(api_key: String, http_client: HttpClient) -> Self {
        let defaults = GeminiConfig::default();
        Self { http_client, api_key, model: defaults.model, base_url: defaults.base_url }
    }

    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns `CalPilotError::Config` when no API key is configured.
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.api_key.clone().filter(|key| !key.trim().is_empty()).ok_or_else(
            || CalPilotError::Config("GEMINI_API_KEY is not set".to_string()),
        )?;
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .build()?;

        Ok(Self::new(api_key, http_client)
            .with_model(config.model.clone())
            .with_base_url(config.base_url.clone()))
    }

    /// Use a different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a different API base URL (tests, proxies)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send `prompt` and return the trimmed text of the first candidate.
    pub async fn generate_text(&self, prompt: String) -> std::result::Result<String, GeminiError> {
        let request_payload = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: Some(GenerationConfig { temperature: DEFAULT_TEMPERATURE }),
        };

        let request_builder = self
            .http_client
            .request(Method::POST, self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request_payload);

        let response = self
            .http_client
            .send(request_builder)
            .await
            .map_err(|err| GeminiError::Network(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), model = %self.model, "Received Gemini API response");

        if !status.is_success() {
            return Err(handle_error_status(status.as_u16(), response).await);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::InvalidSchema(format!("Failed to parse response: {}", e)))?;

        let Some(candidate) = body.candidates.first() else {
            let feedback = body.prompt_feedback.map(|f| f.to_string()).unwrap_or_default();
            return Err(GeminiError::EmptyResponse(format!("no candidates {feedback}")));
        };

        let text = candidate.text().trim().to_string();
        if text.is_empty() {
            let reason = candidate.finish_reason.clone().unwrap_or_else(|| "unknown".into());
            return Err(GeminiError::EmptyResponse(format!("finish reason {reason}")));
        }

        Ok(text)
    }
}

async fn handle_error_status(status: u16, response: reqwest::Response) -> GeminiError {
    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        401 | 403 => GeminiError::Authentication(format!("API key rejected ({})", status)),
        429 => GeminiError::RateLimit,
        _ => GeminiError::Api { status, message },
    }
}

/// Prompt followed by the context rendered as pretty JSON.
fn render_prompt(prompt: &str, context: &Value) -> String {
    let rendered = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
    format!("{prompt}\n\nContext:\n{rendered}")
}

#[async_trait]
impl GenerationCapability for GeminiClient {
    async fn generate(&self, prompt: &str, context: &Value) -> Result<String> {
        info!(model = %self.model, "Requesting generation");
        self.generate_text(render_prompt(prompt, context)).await.map_err(|err| {
            warn!(error = %err, "Gemini generation failed");
            CalPilotError::from(err)
        })
    }
}
