//! Per-request state threaded through the assistant pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::event::CalendarEvent;
use super::intent::Intent;
use super::parameters::EventParameters;
use crate::impl_domain_enum_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl_domain_enum_conversions!(Role {
    User => "user",
    Assistant => "assistant",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Verdict of the validate stage: the one branch in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Proceed { parameters: EventParameters },
    Abort { errors: Vec<String> },
}

impl ValidationOutcome {
    pub fn abort(error: impl Into<String>) -> Self {
        Self::Abort { errors: vec![error.into()] }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }

    pub fn errors(&self) -> &[String] {
        match self {
            Self::Proceed { .. } => &[],
            Self::Abort { errors } => errors,
        }
    }
}

/// Result of checking the proposed window against the live calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub conflict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_event: Option<CalendarEvent>,
}

impl ConflictReport {
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn with(event: CalendarEvent) -> Self {
        Self { conflict: true, conflicting_event: Some(event) }
    }
}

/// Outcome of the action stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionResult {
    /// The tool ran; `result` is the normalized payload it returned.
    Executed { intent: Intent, result: Value },
    /// Validation aborted the request; nothing was sent to the calendar.
    Rejected { errors: Vec<String> },
}

impl ActionResult {
    /// Value handed to the feedback stage. Rejections use the
    /// `{status: "error", details}` envelope.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Executed { result, .. } => result.clone(),
            Self::Rejected { errors } => json!({"status": "error", "details": errors}),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Executed { result, .. } => !matches!(
                result.get("status").and_then(Value::as_str),
                Some("error" | "conflict" | "failed")
            ),
            Self::Rejected { .. } => false,
        }
    }
}

/// Everything known about one request, owned by the pipeline run.
///
/// `intent` is write-once: the first successful classification sticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestState {
    pub request_id: Uuid,
    pub messages: Vec<ChatMessage>,
    intent: Option<Intent>,
    pub parameters: EventParameters,
    pub validation: Option<ValidationOutcome>,
    pub conflict: Option<ConflictReport>,
    pub action_result: Option<ActionResult>,
    pub feedback_message: Option<String>,
}

impl RequestState {
    pub fn new(query: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), query)
    }

    pub fn with_id(request_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            request_id,
            messages: vec![ChatMessage::user(query)],
            intent: None,
            parameters: EventParameters::default(),
            validation: None,
            conflict: None,
            action_result: None,
            feedback_message: None,
        }
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    /// Record the intent. Returns `false` (and keeps the existing value) if
    /// an intent was already set.
    pub fn set_intent(&mut self, intent: Intent) -> bool {
        if self.intent.is_some() {
            return false;
        }
        self.intent = Some(intent);
        true
    }

    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}
