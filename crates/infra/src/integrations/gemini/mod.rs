/// Gemini integration for text generation
///
/// Every pipeline stage that needs language understanding goes through
/// [`GeminiClient`], which implements `calpilot_core::GenerationCapability`.
///
/// # API Integration
///
/// - Endpoint: `POST {base}/v1beta/models/{model}:generateContent?key=...`
/// - Model: `gemini-2.5-flash` (configurable via `with_model()`)
/// - The prompt is sent followed by `Context:` and the pretty-printed context
///
/// # Error Handling
///
/// - **Network errors / 5xx / 429**: retried by `HttpClient`
/// - **401/403**: `GeminiError::Authentication`
/// - Every `GeminiError` maps to `CalPilotError::Capability`
pub mod client;
pub mod types;

pub use client::GeminiClient;
pub use types::GeminiError;
