//! # CalPilot Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The shared retrying HTTP client and error conversions
//! - Configuration loading (file + environment)
//! - External service integrations (Gemini, Google OAuth, Google Calendar)
//! - The stdio tool transport and the calendar tool server
//! - Logging initialization
//!
//! ## Architecture
//! - Implements traits defined in `calpilot-core`
//! - Depends on `calpilot-domain` and `calpilot-core`
//! - Contains all "impure" code (I/O, processes, HTTP)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;
pub mod tools;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::gemini::GeminiClient;
pub use integrations::google::{GoogleCalendarApi, OAuthCredentialRelay, StaticTokenProvider};
pub use observability::init_logging;
pub use tools::{CalendarTools, StdioSessionOpener, ToolServer};
