//! The five pipeline stages.
//!
//! Each stage takes the request state by value and hands back the updated
//! state. Capability output is parsed defensively, so malformed text never
//! fails a stage; it only leaves fields unknown.

use std::sync::Arc;

use calpilot_domain::{
    safe_json_object, string_field, ActionResult, CalPilotError, ChatMessage, ConflictReport,
    EventDateTime, EventParameters, Intent, RequestState, Result, ValidationOutcome,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::prompts::{data_prompt, FEEDBACK_PROMPT, INTENT_PROMPT, VALIDATION_PROMPT};
use crate::conflict::detect_conflict_excluding;
use crate::generation_ports::GenerationCapability;
use crate::tools::{SessionOpener, ToolClient, ToolClientOptions};

/// Runs individual stages against a capability and a tool executor.
pub struct StageRunner {
    capability: Arc<dyn GenerationCapability>,
    tools: Arc<dyn SessionOpener>,
    tool_options: ToolClientOptions,
}

impl StageRunner {
    pub fn new(
        capability: Arc<dyn GenerationCapability>,
        tools: Arc<dyn SessionOpener>,
        tool_options: ToolClientOptions,
    ) -> Self {
        Self { capability, tools, tool_options }
    }

    /// Set `intent` from the latest user message. Unrecognized answers leave
    /// it unset; an intent that is already set is kept.
    pub async fn classify_intent(&self, mut state: RequestState) -> Result<RequestState> {
        if state.intent().is_some() {
            return Ok(state);
        }
        let Some(query) = state.latest_user_message().map(str::to_string) else {
            return Ok(state);
        };

        let raw = self.capability.generate(INTENT_PROMPT, &json!({"query": query})).await?;
        let answer = safe_json_object(&raw);

        match string_field(&answer, &["intent"]).as_deref().and_then(Intent::parse) {
            Some(intent) => {
                state.set_intent(intent);
                info!(request_id = %state.request_id, intent = %intent, "Classified request");
            }
            None => {
                info!(request_id = %state.request_id, "Request intent is ambiguous");
            }
        }
        Ok(state)
    }

    /// Fill `parameters` with the fields the intent needs.
    pub async fn extract_parameters(&self, mut state: RequestState) -> Result<RequestState> {
        let Some(intent) = state.intent() else {
            return Ok(state);
        };
        let query = state.latest_user_message().unwrap_or_default().to_string();
        let context = json!({
            "intent": intent,
            "query": query,
            "now": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        });

        let raw = self.capability.generate(&data_prompt(intent), &context).await?;
        state.parameters = EventParameters::from_mapping(&safe_json_object(&raw));
        debug!(request_id = %state.request_id, parameters = ?state.parameters, "Extracted parameters");
        Ok(state)
    }

    /// Decide whether the request may proceed.
    ///
    /// Local checks run first and skip the capability when they fail. For
    /// create and update the proposed window is then checked against the live
    /// calendar. A check that cannot read the calendar fails the request.
    pub async fn validate(&self, mut state: RequestState) -> Result<RequestState> {
        let outcome = match state.intent() {
            None => ValidationOutcome::abort(CalPilotError::ClassificationAmbiguous.to_string()),
            Some(intent) => self.validate_intent(&mut state, intent).await?,
        };

        match &outcome {
            ValidationOutcome::Proceed { .. } => {
                info!(request_id = %state.request_id, "Validation passed");
            }
            ValidationOutcome::Abort { errors } => {
                info!(request_id = %state.request_id, errors = ?errors, "Validation aborted request");
            }
        }
        state.validation = Some(outcome);
        Ok(state)
    }

    async fn validate_intent(
        &self,
        state: &mut RequestState,
        intent: Intent,
    ) -> Result<ValidationOutcome> {
        let local_errors = state.parameters.local_errors(intent);
        if !local_errors.is_empty() {
            return Ok(ValidationOutcome::Abort { errors: local_errors });
        }

        let context = json!({"intent": intent, "data": state.parameters});
        let raw = self.capability.generate(VALIDATION_PROMPT, &context).await?;
        let verdict = safe_json_object(&raw);
        // A missing verdict counts as a rejection.
        let valid = verdict.get("valid").and_then(Value::as_bool).unwrap_or(false);
        if !valid {
            let mut errors = verdict_errors(&verdict);
            if errors.is_empty() {
                errors.push("the request could not be validated".to_string());
            }
            return Ok(ValidationOutcome::Abort { errors });
        }

        if intent.requires_conflict_check() {
            if let Some(errors) = self.check_conflicts(state, intent).await? {
                return Ok(ValidationOutcome::Abort { errors });
            }
        }

        Ok(ValidationOutcome::Proceed { parameters: state.parameters.clone() })
    }

    /// `Some(errors)` when the proposed window is occupied.
    async fn check_conflicts(
        &self,
        state: &mut RequestState,
        intent: Intent,
    ) -> Result<Option<Vec<String>>> {
        let Some((start, end)) = state.parameters.window() else {
            // Updates that keep their time need no check.
            return Ok(None);
        };
        let time_min = state.parameters.start.clone();
        let time_max = state.parameters.end.clone();
        let ignore_id = match intent {
            Intent::UpdateEvent => state.parameters.event_id.clone(),
            _ => None,
        };

        let scan = ToolClient::scoped(self.tools.as_ref(), self.tool_options, |client| async move {
            client.fetch_events(time_min.as_deref(), time_max.as_deref()).await
        })
        .await
        .and_then(|events| {
            detect_conflict_excluding(start, end, &events, ignore_id.as_deref())
                .map(|hit| hit.cloned())
        });

        match scan {
            Ok(Some(existing)) => {
                info!(request_id = %state.request_id, conflicting_event = %existing.id, "Conflict detected");
                let message = format!(
                    "the requested time conflicts with '{}' ({} to {})",
                    existing.title(),
                    display_time(&existing.start),
                    display_time(&existing.end),
                );
                state.conflict = Some(ConflictReport::with(existing));
                Ok(Some(vec![message]))
            }
            Ok(None) => {
                state.conflict = Some(ConflictReport::clear());
                Ok(None)
            }
            Err(CalPilotError::MalformedEvent(details)) => {
                warn!(request_id = %state.request_id, details = %details, "Calendar returned a malformed event; treating window as busy");
                state.conflict = Some(ConflictReport { conflict: true, conflicting_event: None });
                Ok(Some(vec![format!("could not verify that the requested time is free: {details}")]))
            }
            Err(err) => Err(err),
        }
    }

    /// Run the validated operation against the calendar, or record the
    /// rejection without contacting it.
    pub async fn execute_action(&self, mut state: RequestState) -> Result<RequestState> {
        let (intent, parameters) = match (&state.validation, state.intent()) {
            (Some(ValidationOutcome::Proceed { parameters }), Some(intent)) => {
                (intent, parameters.clone())
            }
            (Some(ValidationOutcome::Abort { errors }), _) => {
                state.action_result = Some(ActionResult::Rejected { errors: errors.clone() });
                return Ok(state);
            }
            _ => {
                state.action_result = Some(ActionResult::Rejected {
                    errors: vec!["the request was not validated".to_string()],
                });
                return Ok(state);
            }
        };
        let result = ToolClient::scoped(self.tools.as_ref(), self.tool_options, |client| async move {
            dispatch(&client, intent, &parameters).await
        })
        .await?;

        let action = ActionResult::Executed { intent, result };
        if !action.is_success() {
            warn!(request_id = %state.request_id, intent = %intent, "Calendar operation reported a failure");
        } else if intent.is_mutating() {
            info!(request_id = %state.request_id, intent = %intent, "Calendar updated");
        } else {
            debug!(request_id = %state.request_id, intent = %intent, "Calendar read");
        }
        state.action_result = Some(action);
        Ok(state)
    }

    /// Summarize the outcome for the user.
    ///
    /// A capability failure or empty answer falls back to a plain summary,
    /// since the calendar may already have changed.
    pub async fn generate_feedback(&self, mut state: RequestState) -> Result<RequestState> {
        let result = state.action_result.as_ref().map(ActionResult::to_value).unwrap_or(Value::Null);
        let context = json!({
            "query": state.latest_user_message().unwrap_or_default(),
            "intent": state.intent(),
            "result": result,
        });

        let message = match self.capability.generate(FEEDBACK_PROMPT, &context).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_feedback(&state),
            Err(err) => {
                warn!(request_id = %state.request_id, error = %err, "Feedback generation failed; using plain summary");
                fallback_feedback(&state)
            }
        };

        state.push_message(ChatMessage::assistant(message.clone()));
        state.feedback_message = Some(message);
        Ok(state)
    }
}

async fn dispatch(client: &ToolClient, intent: Intent, parameters: &EventParameters) -> Result<Value> {
    match intent {
        Intent::ListEvents => {
            client.list_events(parameters.time_min.as_deref(), parameters.time_max.as_deref()).await
        }
        Intent::CreateEvent => {
            let event = parameters
                .to_new_event()
                .ok_or_else(|| CalPilotError::InvalidInput("incomplete event fields".into()))?;
            client.create_event(&event).await
        }
        Intent::UpdateEvent => {
            let patch = parameters
                .to_patch()
                .ok_or_else(|| CalPilotError::InvalidInput("missing event_id".into()))?;
            client.update_event(&patch).await
        }
        Intent::DeleteEvent => {
            let event_id = parameters
                .event_id
                .as_deref()
                .ok_or_else(|| CalPilotError::InvalidInput("missing event_id".into()))?;
            client.delete_event(event_id).await
        }
    }
}

fn display_time(time: &EventDateTime) -> &str {
    time.date_time.as_deref().or(time.date.as_deref()).unwrap_or("?")
}

/// `errors` as a list of strings, a single string, or absent.
fn verdict_errors(verdict: &Map<String, Value>) -> Vec<String> {
    match verdict.get("errors") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .filter(|text| !text.trim().is_empty())
            .collect(),
        Some(Value::String(text)) if !text.trim().is_empty() => vec![text.clone()],
        _ => Vec::new(),
    }
}

fn fallback_feedback(state: &RequestState) -> String {
    match &state.action_result {
        Some(ActionResult::Rejected { errors }) if state.intent().is_none() => {
            format!(
                "{} Do you want to list, create, update or delete an event?",
                errors.join(" ")
            )
        }
        Some(ActionResult::Rejected { errors }) => {
            format!("I couldn't do that. {}.", CalPilotError::ValidationFailed(errors.clone()))
        }
        Some(ActionResult::Executed { intent, result }) => {
            let status = result.get("status").and_then(Value::as_str).unwrap_or("done");
            let title = result
                .get("event")
                .and_then(|event| event.get("summary"))
                .and_then(Value::as_str);
            match (status, title) {
                ("created", Some(title)) => format!("Created '{title}'."),
                ("updated", Some(title)) => format!("Updated '{title}'."),
                ("deleted", _) => "The event was deleted.".to_string(),
                ("conflict", _) => "That time is already taken on your calendar.".to_string(),
                _ => format!("{} finished with status '{status}'.", intent),
            }
        }
        None => "Nothing was done.".to_string(),
    }
}
