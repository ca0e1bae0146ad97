//! Text-generation capability port

use async_trait::async_trait;
use calpilot_domain::Result;
use serde_json::Value;

/// A natural-language generation backend.
///
/// Every stage that needs language understanding (classify, extract,
/// validate, summarize) calls `generate` with its own prompt template and a
/// JSON context mapping. Output is free text; callers parse it defensively.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    /// Generate text for `prompt` given `context`.
    ///
    /// Fails with `Capability` when the backend cannot produce text.
    async fn generate(&self, prompt: &str, context: &Value) -> Result<String>;
}
