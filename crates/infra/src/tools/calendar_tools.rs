//! Calendar tools served by `calpilot-tool-server`
//!
//! `create_event` and `update_event` re-check the window against the live
//! calendar before writing; an occupied window yields
//! `{"status": "conflict", "conflicting_event": ...}` and nothing is written.

use async_trait::async_trait;
use calpilot_core::conflict::{detect_conflict, detect_conflict_excluding};
use calpilot_core::tools::protocol::{ResourceContents, ResourceDescriptor, ToolDescriptor};
use calpilot_domain::constants::{
    EVENTS_RESOURCE_URI, TOOL_CREATE_EVENT, TOOL_DELETE_EVENT, TOOL_LIST_EVENTS, TOOL_UPDATE_EVENT,
};
use calpilot_domain::{
    parse_instant, validate_timezone, CalPilotError, CalendarEvent, EventPatch, NewEvent, Result,
};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::integrations::google::{DeleteOutcome, GoogleCalendarApi};
use crate::tools::server::ToolHandler;

/// [`ToolHandler`] backed by the Google Calendar API.
pub struct CalendarTools {
    api: GoogleCalendarApi,
}

impl CalendarTools {
    pub fn new(api: GoogleCalendarApi) -> Self {
        Self { api }
    }

    async fn list_events(&self, arguments: &Value) -> Result<Value> {
        let time_min = optional_str(arguments, "time_min");
        let time_max = optional_str(arguments, "time_max");
        let events = self.api.list_events(time_min, time_max).await?;
        Ok(json!({"events": events}))
    }

    async fn create_event(&self, arguments: &Value) -> Result<Value> {
        let new: NewEvent = decode_arguments(arguments)?;
        let start = parse_instant(&new.start_iso)?;
        let end = parse_instant(&new.end_iso)?;
        if start >= end {
            return Err(CalPilotError::InvalidInput("event start must be before its end".into()));
        }
        validate_timezone(&new.timezone)?;

        let existing = self.api.list_events(Some(&new.start_iso), Some(&new.end_iso)).await?;
        if let Some(conflict) = detect_conflict(start, end, &existing)? {
            info!(conflicting_event = %conflict.id, "Refusing to create over an existing event");
            return Ok(json!({"status": "conflict", "conflicting_event": conflict}));
        }

        let mut body = json!({
            "summary": new.summary,
            "start": {"dateTime": new.start_iso, "timeZone": new.timezone},
            "end": {"dateTime": new.end_iso, "timeZone": new.timezone},
        });
        if let Some(description) = &new.description {
            body["description"] = json!(description);
        }
        if !new.attendees.is_empty() {
            let attendees: Vec<Value> =
                new.attendees.iter().map(|email| json!({"email": email})).collect();
            body["attendees"] = Value::Array(attendees);
        }

        let created = self.api.insert_event(&body).await?;
        info!(event_id = %created.id, "Created calendar event");
        Ok(json!({"status": "created", "event": created}))
    }

    async fn update_event(&self, arguments: &Value) -> Result<Value> {
        let patch: EventPatch = decode_arguments(arguments)?;
        let mut raw: Value = self.api.get_event(&patch.event_id).await?;
        let current: CalendarEvent = serde_json::from_value(raw.clone()).map_err(|e| {
            CalPilotError::MalformedEvent(format!("event '{}': {}", patch.event_id, e))
        })?;

        if let Some(zone) = &patch.timezone {
            validate_timezone(zone)?;
        }

        if let (Some(start_iso), Some(end_iso)) = (&patch.start_iso, &patch.end_iso) {
            let start = parse_instant(start_iso)?;
            let end = parse_instant(end_iso)?;
            if start >= end {
                return Err(CalPilotError::InvalidInput("event start must be before its end".into()));
            }
            let existing = self.api.list_events(Some(start_iso), Some(end_iso)).await?;
            if let Some(conflict) =
                detect_conflict_excluding(start, end, &existing, Some(patch.event_id.as_str()))?
            {
                info!(event_id = %patch.event_id, conflicting_event = %conflict.id, "Refusing to move onto an existing event");
                return Ok(json!({"status": "conflict", "conflicting_event": conflict}));
            }
        } else if patch.start_iso.is_some() || patch.end_iso.is_some() {
            warn!(event_id = %patch.event_id, "Rescheduling one bound only; skipping conflict check");
        }

        let Some(fields) = raw.as_object_mut() else {
            return Err(CalPilotError::MalformedEvent(format!(
                "event '{}' is not a JSON object",
                patch.event_id
            )));
        };
        merge_patch(fields, &patch, &current);

        let updated = self.api.update_event(&patch.event_id, &raw).await?;
        info!(event_id = %updated.id, "Updated calendar event");
        Ok(json!({"status": "updated", "event": updated}))
    }

    async fn delete_event(&self, arguments: &Value) -> Result<Value> {
        let Some(event_id) = optional_str(arguments, "event_id") else {
            return Err(CalPilotError::InvalidInput("missing required field 'event_id'".into()));
        };
        match self.api.delete_event(event_id).await? {
            DeleteOutcome::Deleted => {
                info!(event_id, "Deleted calendar event");
                Ok(json!({"status": "deleted", "event_id": event_id}))
            }
            DeleteOutcome::Failed(details) => {
                warn!(event_id, %details, "Calendar refused delete");
                Ok(json!({"status": "failed", "details": details}))
            }
        }
    }
}

/// Apply `patch` onto the raw event; times keep the event's zone unless one
/// is given.
fn merge_patch(fields: &mut Map<String, Value>, patch: &EventPatch, current: &CalendarEvent) {
    if let Some(summary) = &patch.summary {
        fields.insert("summary".into(), json!(summary));
    }
    if let Some(description) = &patch.description {
        fields.insert("description".into(), json!(description));
    }

    let zone_for = |existing: &Option<String>| {
        patch.timezone.clone().or_else(|| existing.clone()).unwrap_or_else(|| "UTC".to_string())
    };
    if let Some(start) = &patch.start_iso {
        let zone = zone_for(&current.start.time_zone);
        fields.insert("start".into(), json!({"dateTime": start, "timeZone": zone}));
    }
    if let Some(end) = &patch.end_iso {
        let zone = zone_for(&current.end.time_zone);
        fields.insert("end".into(), json!({"dateTime": end, "timeZone": zone}));
    }
}

fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn decode_arguments<T: DeserializeOwned>(arguments: &Value) -> Result<T> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| CalPilotError::InvalidInput(format!("invalid tool arguments: {e}")))
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({"type": "object", "properties": properties, "required": required})
}

#[async_trait]
impl ToolHandler for CalendarTools {
    fn tools(&self) -> Vec<ToolDescriptor> {
        let iso = json!({"type": "string", "description": "RFC 3339 datetime with offset"});
        vec![
            ToolDescriptor {
                name: TOOL_LIST_EVENTS.into(),
                description: Some("List events, optionally within [time_min, time_max).".into()),
                input_schema: schema(json!({"time_min": iso, "time_max": iso}), &[]),
            },
            ToolDescriptor {
                name: TOOL_CREATE_EVENT.into(),
                description: Some("Create an event unless the window is already taken.".into()),
                input_schema: schema(
                    json!({
                        "summary": {"type": "string"},
                        "start_iso": iso,
                        "end_iso": iso,
                        "timezone": {"type": "string", "description": "IANA zone name"},
                        "description": {"type": "string"},
                        "attendees": {"type": "array", "items": {"type": "string"}}
                    }),
                    &["summary", "start_iso", "end_iso", "timezone"],
                ),
            },
            ToolDescriptor {
                name: TOOL_UPDATE_EVENT.into(),
                description: Some("Change an event; moving it re-checks for conflicts.".into()),
                input_schema: schema(
                    json!({
                        "event_id": {"type": "string"},
                        "start_iso": iso,
                        "end_iso": iso,
                        "timezone": {"type": "string"},
                        "summary": {"type": "string"},
                        "description": {"type": "string"}
                    }),
                    &["event_id"],
                ),
            },
            ToolDescriptor {
                name: TOOL_DELETE_EVENT.into(),
                description: Some("Delete an event by id.".into()),
                input_schema: schema(json!({"event_id": {"type": "string"}}), &["event_id"]),
            },
        ]
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value> {
        match name {
            TOOL_LIST_EVENTS => self.list_events(arguments).await,
            TOOL_CREATE_EVENT => self.create_event(arguments).await,
            TOOL_UPDATE_EVENT => self.update_event(arguments).await,
            TOOL_DELETE_EVENT => self.delete_event(arguments).await,
            other => Err(CalPilotError::InvalidInput(format!("unknown tool '{other}'"))),
        }
    }

    fn resources(&self) -> Vec<ResourceDescriptor> {
        vec![ResourceDescriptor {
            uri: EVENTS_RESOURCE_URI.into(),
            name: "Upcoming events".into(),
            description: Some("Events from now on, as JSON".into()),
            mime_type: Some("application/json".into()),
        }]
    }

    async fn read_resource(&self, uri: &str) -> Result<Option<ResourceContents>> {
        if uri != EVENTS_RESOURCE_URI {
            return Ok(None);
        }
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let events = self.api.list_events(Some(&now), None).await?;
        let text = serde_json::to_string(&events)
            .map_err(|e| CalPilotError::Internal(format!("cannot encode events: {e}")))?;
        Ok(Some(ResourceContents {
            uri: uri.to_string(),
            mime_type: Some("application/json".into()),
            text: Some(text),
        }))
    }
}
