//! Parameters extracted from a request and the tool argument shapes built
//! from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::intent::Intent;
use crate::utils::json::string_field;
use crate::utils::time::{parse_instant, validate_timezone};

/// Fallback zone when a create request names none.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Fields extracted from the user's request. `None` means "not known yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_max: Option<String>,
}

impl EventParameters {
    /// Build from a loosely-shaped mapping, accepting the key spellings
    /// capabilities tend to produce (`start_iso`, `timeZone`, `eventId`, ...).
    pub fn from_mapping(map: &Map<String, Value>) -> Self {
        // Some capabilities nest the fields under "parameters".
        if let Some(Value::Object(inner)) = map.get("parameters") {
            return Self::from_mapping(inner);
        }

        Self {
            summary: string_field(map, &["summary", "title"]),
            start: string_field(map, &["start", "start_iso", "start_time", "startTime"]),
            end: string_field(map, &["end", "end_iso", "end_time", "endTime"]),
            timezone: string_field(map, &["timezone", "time_zone", "timeZone"]),
            attendees: map.get("attendees").map(attendee_emails).unwrap_or_default(),
            event_id: string_field(map, &["event_id", "eventId", "id"]),
            description: string_field(map, &["description", "notes"]),
            time_min: string_field(map, &["time_min", "timeMin"]),
            time_max: string_field(map, &["time_max", "timeMax"]),
        }
    }

    /// Proposed `[start, end)` window, if both ends are present and valid.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = parse_instant(self.start.as_deref()?).ok()?;
        let end = parse_instant(self.end.as_deref()?).ok()?;
        Some((start, end))
    }

    /// Deterministic checks that need no capability call.
    ///
    /// Returns an empty list when the parameters are structurally usable for
    /// `intent`.
    pub fn local_errors(&self, intent: Intent) -> Vec<String> {
        let mut errors = Vec::new();

        match intent {
            Intent::CreateEvent => {
                for (name, value) in
                    [("summary", &self.summary), ("start", &self.start), ("end", &self.end)]
                {
                    if value.is_none() {
                        errors.push(format!("missing required field '{name}'"));
                    }
                }
            }
            Intent::UpdateEvent | Intent::DeleteEvent => {
                if self.event_id.is_none() {
                    errors.push("missing required field 'event_id'".to_string());
                }
            }
            Intent::ListEvents => {}
        }

        let mut instants = Vec::with_capacity(2);
        for (name, value) in [
            ("start", &self.start),
            ("end", &self.end),
            ("time_min", &self.time_min),
            ("time_max", &self.time_max),
        ] {
            if let Some(raw) = value {
                match parse_instant(raw) {
                    Ok(instant) if name == "start" || name == "end" => instants.push(instant),
                    Ok(_) => {}
                    Err(_) => errors.push(format!(
                        "'{name}' must be an ISO 8601 datetime with offset, got '{raw}'"
                    )),
                }
            }
        }
        if let [start, end] = instants[..] {
            if start >= end {
                errors.push("event start must be before its end".to_string());
            }
        }
        if intent == Intent::UpdateEvent && self.start.is_some() != self.end.is_some() {
            errors.push("rescheduling needs both 'start' and 'end'".to_string());
        }

        if let Some(zone) = &self.timezone {
            if validate_timezone(zone).is_err() {
                errors.push(format!("unknown timezone '{zone}'"));
            }
        }

        errors
    }

    /// Arguments for `create_event`. `None` when a required field is missing.
    pub fn to_new_event(&self) -> Option<NewEvent> {
        Some(NewEvent {
            summary: self.summary.clone()?,
            start_iso: self.start.clone()?,
            end_iso: self.end.clone()?,
            timezone: self.timezone.clone().unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            description: self.description.clone(),
            attendees: self.attendees.clone(),
        })
    }

    /// Arguments for `update_event`. `None` without an `event_id`.
    pub fn to_patch(&self) -> Option<EventPatch> {
        Some(EventPatch {
            event_id: self.event_id.clone()?,
            start_iso: self.start.clone(),
            end_iso: self.end.clone(),
            timezone: self.timezone.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
        })
    }
}

/// Accepts `["a@x"]`, `[{"email": "a@x"}]` or `"a@x, b@x"`.
fn attendee_emails(value: &Value) -> Vec<String> {
    let emails: Vec<String> = match value {
        Value::String(text) => text.split(',').map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(email) => Some(email.clone()),
                Value::Object(obj) => obj.get("email").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    emails.into_iter().map(|e| e.trim().to_string()).filter(|e| !e.is_empty()).collect()
}

/// `create_event` tool arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub summary: String,
    pub start_iso: String,
    pub end_iso: String,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
}

/// `update_event` tool arguments; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_iso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_iso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
