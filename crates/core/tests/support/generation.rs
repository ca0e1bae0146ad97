use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calpilot_core::pipeline::prompts::{FEEDBACK_PROMPT, INTENT_PROMPT, VALIDATION_PROMPT};
use calpilot_core::GenerationCapability;
use calpilot_domain::{CalPilotError, Result as DomainResult};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Intent,
    Data,
    Validation,
    Feedback,
}

/// Generation capability with one canned answer per stage.
///
/// Records the kind and context of every call. A stage without an answer
/// fails with `Capability`.
#[derive(Clone, Default)]
pub struct ScriptedCapability {
    intent: Option<String>,
    data: Option<String>,
    validation: Option<String>,
    feedback: Option<String>,
    calls: Arc<Mutex<Vec<(PromptKind, Value)>>>,
}

impl ScriptedCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent(mut self, reply: &str) -> Self {
        self.intent = Some(reply.to_string());
        self
    }

    pub fn data(mut self, reply: &str) -> Self {
        self.data = Some(reply.to_string());
        self
    }

    pub fn validation(mut self, reply: &str) -> Self {
        self.validation = Some(reply.to_string());
        self
    }

    pub fn feedback(mut self, reply: &str) -> Self {
        self.feedback = Some(reply.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(PromptKind, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: PromptKind) -> Vec<Value> {
        self.calls().into_iter().filter(|(k, _)| *k == kind).map(|(_, ctx)| ctx).collect()
    }
}

#[async_trait]
impl GenerationCapability for ScriptedCapability {
    async fn generate(&self, prompt: &str, context: &Value) -> DomainResult<String> {
        let kind = if prompt == INTENT_PROMPT {
            PromptKind::Intent
        } else if prompt == VALIDATION_PROMPT {
            PromptKind::Validation
        } else if prompt == FEEDBACK_PROMPT {
            PromptKind::Feedback
        } else {
            PromptKind::Data
        };
        self.calls.lock().unwrap().push((kind, context.clone()));

        let reply = match kind {
            PromptKind::Intent => &self.intent,
            PromptKind::Data => &self.data,
            PromptKind::Validation => &self.validation,
            PromptKind::Feedback => &self.feedback,
        };
        reply
            .clone()
            .ok_or_else(|| CalPilotError::Capability(format!("no scripted reply for {kind:?}")))
    }
}
