//! Configuration structures
//!
//! Every section implements `Default` and is `#[serde(default)]`, so partial
//! TOML/JSON files and environment overlays both produce a complete config.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CALENDAR_ID, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_GEMINI_MODEL, GEMINI_API_BASE,
    GOOGLE_CALENDAR_API_BASE,
};

/// Root application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub google: GoogleConfig,
    pub tools: ToolServerConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Text-generation capability settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
            timeout_secs: 60,
            max_attempts: 3,
        }
    }
}

/// Google OAuth client + calendar settings used by the tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Installed-app client secrets (`{"installed": {...}}`).
    pub credentials_path: String,
    /// Stored refresh token (`{"refresh_token": ...}`).
    pub token_path: String,
    pub calendar_id: String,
    pub api_base: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            credentials_path: "credentials.json".to_string(),
            token_path: "token.json".to_string(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
        }
    }
}

/// How the pipeline launches and talks to the calendar tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub call_timeout_secs: u64,
    /// Fetch a token in the pipeline process and hand it to the child.
    pub forward_access_token: bool,
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            command: "calpilot-tool-server".to_string(),
            args: Vec::new(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            forward_access_token: true,
        }
    }
}

/// HTTP surface settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8000".to_string() }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}
