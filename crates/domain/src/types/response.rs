//! Outward response envelope.

use serde::{Deserialize, Serialize};

/// `{"response": text}` on success, `{"response": null, "error": text}` on
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { response: Some(text.into()), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { response: None, error: Some(error.into()) }
    }
}
