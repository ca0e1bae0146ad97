//! Configuration loader
//!
//! Loads application configuration from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. Searches multiple paths for a config file (JSON or TOML)
//! 2. Falls back to built-in defaults when no file exists
//! 3. Overlays environment variables on top of whatever was loaded
//!
//! ## Environment Variables
//! - `CALPILOT_GEMINI_API_KEY` (or `GEMINI_API_KEY`): generation API key
//! - `CALPILOT_GEMINI_MODEL`, `CALPILOT_GEMINI_BASE_URL`,
//!   `CALPILOT_GEMINI_TIMEOUT_SECS`
//! - `CALPILOT_GOOGLE_CREDENTIALS_PATH`, `CALPILOT_GOOGLE_TOKEN_PATH`,
//!   `CALPILOT_GOOGLE_CALENDAR_ID`, `CALPILOT_GOOGLE_API_BASE`
//! - `CALPILOT_TOOL_COMMAND`, `CALPILOT_TOOL_ARGS` (whitespace separated),
//!   `CALPILOT_TOOL_CALL_TIMEOUT_SECS`, `CALPILOT_FORWARD_ACCESS_TOKEN`
//! - `CALPILOT_BIND_ADDR`
//! - `CALPILOT_LOG_FILTER`, `CALPILOT_LOG_JSON`
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./calpilot.json` or `./calpilot.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use calpilot_domain::{CalPilotError, Config, Result};

/// Load configuration: file (or defaults) first, environment on top.
///
/// # Errors
/// Returns `CalPilotError::Config` if a config file exists but cannot be
/// parsed, or an environment variable holds an invalid value.
pub fn load() -> Result<Config> {
    let base = match search_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    let config = apply_env_overrides(base)?;
    tracing::info!(
        model = %config.gemini.model,
        tool_command = %config.tools.command,
        has_api_key = config.gemini.api_key.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from environment variables over the defaults.
///
/// # Errors
/// Returns `CalPilotError::Config` when a numeric variable does not parse.
pub fn load_from_env() -> Result<Config> {
    apply_env_overrides(Config::default())
}

/// Overlay every recognised environment variable onto `config`.
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    if let Some(key) = env_opt("CALPILOT_GEMINI_API_KEY").or_else(|| env_opt("GEMINI_API_KEY")) {
        config.gemini.api_key = Some(key);
    }
    if let Some(model) = env_opt("CALPILOT_GEMINI_MODEL") {
        config.gemini.model = model;
    }
    if let Some(base_url) = env_opt("CALPILOT_GEMINI_BASE_URL") {
        config.gemini.base_url = base_url;
    }
    if let Some(timeout) = env_parse::<u64>("CALPILOT_GEMINI_TIMEOUT_SECS")? {
        config.gemini.timeout_secs = timeout;
    }

    if let Some(path) = env_opt("CALPILOT_GOOGLE_CREDENTIALS_PATH") {
        config.google.credentials_path = path;
    }
    if let Some(path) = env_opt("CALPILOT_GOOGLE_TOKEN_PATH") {
        config.google.token_path = path;
    }
    if let Some(calendar_id) = env_opt("CALPILOT_GOOGLE_CALENDAR_ID") {
        config.google.calendar_id = calendar_id;
    }
    if let Some(api_base) = env_opt("CALPILOT_GOOGLE_API_BASE") {
        config.google.api_base = api_base;
    }

    if let Some(command) = env_opt("CALPILOT_TOOL_COMMAND") {
        config.tools.command = command;
    }
    if let Some(args) = env_opt("CALPILOT_TOOL_ARGS") {
        config.tools.args = args.split_whitespace().map(str::to_string).collect();
    }
    if let Some(timeout) = env_parse::<u64>("CALPILOT_TOOL_CALL_TIMEOUT_SECS")? {
        config.tools.call_timeout_secs = timeout;
    }
    config.tools.forward_access_token =
        env_bool("CALPILOT_FORWARD_ACCESS_TOKEN", config.tools.forward_access_token);

    if let Some(bind_addr) = env_opt("CALPILOT_BIND_ADDR") {
        config.server.bind_addr = bind_addr;
    }

    if let Some(filter) = env_opt("CALPILOT_LOG_FILTER") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("CALPILOT_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CalPilotError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CalPilotError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => search_config_paths().ok_or_else(|| {
            CalPilotError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CalPilotError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CalPilotError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CalPilotError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CalPilotError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn search_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("calpilot.json"),
        dir.join("calpilot.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Non-empty environment variable, trimmed.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| CalPilotError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
