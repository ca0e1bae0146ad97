//! # CalPilot Domain
//!
//! Business domain types and models for CalPilot.
//!
//! This crate contains:
//! - Calendar event, intent and request-state types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and pure parsing helpers
//!
//! ## Architecture
//! - No dependencies on other CalPilot crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::json::{safe_json_object, string_field};
pub use utils::time::{parse_instant, validate_timezone};
