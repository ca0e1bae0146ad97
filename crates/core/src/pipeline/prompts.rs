//! Prompt templates for the generation capability.
//!
//! Each stage sends one of these together with a JSON context mapping; the
//! capability appends the context itself.

use calpilot_domain::Intent;

pub const INTENT_PROMPT: &str = r#"You route requests for a calendar assistant.
Decide which single operation the user's query asks for:
- list_events: show or look up existing events
- create_event: add a new event
- update_event: change the time, title or description of an existing event
- delete_event: remove an existing event
If the query does not clearly ask for one of these, use null.
Answer with JSON only: {"intent": "<operation or null>"}"#;

pub const VALIDATION_PROMPT: &str = r#"You check calendar requests before they are executed.
Given the operation and its extracted fields, look for:
- required values that are missing or empty
- datetimes that are not ISO 8601 with a UTC offset
- timezones that are not IANA names such as Asia/Kolkata
- values that contradict the user's query
Answer with JSON only: {"valid": true, "errors": []} or {"valid": false, "errors": ["..."]}"#;

pub const FEEDBACK_PROMPT: &str = r#"You tell the user what happened to their calendar request.
Given their query and the result of the operation, write one or two short,
friendly sentences. Mention titles, dates and times when they are known.
If the result has status "error", "conflict" or "failed", explain what went
wrong and what they could do instead.
Example: "Event 'Team Sync' created on Sept 25, 3-4 PM IST with 2 attendees.""#;

const DATA_PROMPT_HEADER: &str = r#"You extract fields for a calendar operation from the user's query.
Resolve relative dates ("tomorrow", "next Monday") against "now" from the context.
Write datetimes as ISO 8601 with a UTC offset, for example 2025-09-25T15:00:00+05:30,
and timezones as IANA names. Leave out any field the query does not give."#;

/// Extraction prompt listing the fields `intent` needs.
pub fn data_prompt(intent: Intent) -> String {
    let fields = match intent {
        Intent::ListEvents => {
            r#"{"time_min": "<start of range>", "time_max": "<end of range>"}"#
        }
        Intent::CreateEvent => {
            r#"{"summary": "<title>", "start": "<start>", "end": "<end>", "timezone": "<IANA zone>", "description": "<optional>", "attendees": ["<email>"]}"#
        }
        Intent::UpdateEvent => {
            r#"{"event_id": "<id>", "summary": "<new title>", "start": "<new start>", "end": "<new end>", "timezone": "<IANA zone>", "description": "<new description>"}"#
        }
        Intent::DeleteEvent => r#"{"event_id": "<id>"}"#,
    };
    format!("{DATA_PROMPT_HEADER}\nAnswer with JSON only, using these keys:\n{fields}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_prompt_is_scoped_to_intent() {
        assert!(data_prompt(Intent::DeleteEvent).contains("event_id"));
        assert!(!data_prompt(Intent::DeleteEvent).contains("attendees"));
        assert!(data_prompt(Intent::CreateEvent).contains("attendees"));
    }
}
