//! Typed calendar operations over a [`ToolSession`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use calpilot_domain::constants::{
    DEFAULT_CALL_TIMEOUT_SECS, TOOL_CREATE_EVENT, TOOL_DELETE_EVENT, TOOL_LIST_EVENTS,
    TOOL_UPDATE_EVENT,
};
use calpilot_domain::{CalPilotError, CalendarEvent, EventPatch, NewEvent, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::normalize::{is_tool_envelope, normalize, normalize_tool_result};
use super::ports::{SessionOpener, ToolTransport};
use super::protocol::{
    InitializeResult, ResourceContents, ResourceReadParams, ResourcesReadResult, ToolCallParams,
    ToolCallResult, ToolDescriptor, ToolsListResult, METHOD_RESOURCES_READ, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST,
};
use super::session::ToolSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolClientOptions {
    pub call_timeout: Duration,
}

impl Default for ToolClientOptions {
    fn default() -> Self {
        Self { call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS) }
    }
}

pub struct ToolClient {
    session: ToolSession,
}

impl ToolClient {
    /// Wrap an open transport. The handshake has not run yet.
    pub fn new(transport: Box<dyn ToolTransport>, options: ToolClientOptions) -> Self {
        Self { session: ToolSession::new(transport, options.call_timeout) }
    }

    /// Open a session, run `f` against it, and close the session whatever
    /// `f` returns.
    ///
    /// If the returned future is dropped before completion, the transport is
    /// dropped with it and the executor is released.
    pub async fn scoped<F, Fut, T>(
        opener: &dyn SessionOpener,
        options: ToolClientOptions,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<ToolClient>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let transport = opener.open().await?;
        let client = Arc::new(Self::new(transport, options));

        let outcome = match client.initialize().await {
            Ok(_) => f(Arc::clone(&client)).await,
            Err(err) => Err(err),
        };

        if let Err(err) = client.close().await {
            warn!(error = %err, "Failed to close tool session cleanly");
        }
        outcome
    }

    pub async fn initialize(&self) -> Result<InitializeResult> {
        self.session.initialize().await
    }

    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }

    pub async fn list_available_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let result = self.session.request(METHOD_TOOLS_LIST, Some(json!({}))).await?;
        let list: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| CalPilotError::Protocol(format!("invalid tools/list result: {e}")))?;
        Ok(list.tools)
    }

    /// Events in `[time_min, time_max]`, as the server returned them.
    pub async fn list_events(&self, time_min: Option<&str>, time_max: Option<&str>) -> Result<Value> {
        let mut arguments = Map::new();
        if let Some(time_min) = time_min {
            arguments.insert("time_min".into(), Value::from(time_min));
        }
        if let Some(time_max) = time_max {
            arguments.insert("time_max".into(), Value::from(time_max));
        }
        self.call_tool(TOOL_LIST_EVENTS, Value::Object(arguments)).await
    }

    /// Same as [`Self::list_events`], decoded into events for conflict
    /// checks. An entry that is not an event object is `MalformedEvent`.
    pub async fn fetch_events(
        &self,
        time_min: Option<&str>,
        time_max: Option<&str>,
    ) -> Result<Vec<CalendarEvent>> {
        let value = self.list_events(time_min, time_max).await?;
        decode_events(value)
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<Value> {
        self.call_tool(TOOL_CREATE_EVENT, arguments(event)?).await
    }

    pub async fn update_event(&self, patch: &EventPatch) -> Result<Value> {
        self.call_tool(TOOL_UPDATE_EVENT, arguments(patch)?).await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<Value> {
        self.call_tool(TOOL_DELETE_EVENT, json!({"event_id": event_id})).await
    }

    /// Invoke a tool and normalize its result.
    ///
    /// Results the server flags with `isError` come back as
    /// `{"status": "error", "details": <text>}` rather than as errors.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let params = serde_json::to_value(ToolCallParams { name: name.to_string(), arguments })
            .map_err(|e| CalPilotError::Internal(format!("encode tools/call params: {e}")))?;
        let raw = self.session.request(METHOD_TOOLS_CALL, Some(params)).await?;

        // Servers that skip the content envelope hand back the payload itself.
        let envelope = if is_tool_envelope(&raw) {
            serde_json::from_value::<ToolCallResult>(raw.clone()).ok()
        } else {
            None
        };
        let value = match envelope {
            Some(result) if result.is_error => {
                let details = result.text();
                warn!(tool = name, details = %details, "Tool reported an error");
                json!({"status": "error", "details": details})
            }
            Some(result) => normalize_tool_result(&result),
            None => normalize(&raw),
        };
        debug!(tool = name, "Tool call completed");
        Ok(value)
    }

    /// Read a resource such as `cal://events`.
    ///
    /// JSON contents are decoded; other text comes back as a string. Several
    /// content entries yield an array. Unknown URIs fail with `Protocol`.
    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        let params = serde_json::to_value(ResourceReadParams { uri: uri.to_string() })
            .map_err(|e| CalPilotError::Internal(format!("encode resources/read params: {e}")))?;
        let raw = self.session.request(METHOD_RESOURCES_READ, Some(params)).await?;
        let read: ResourcesReadResult = serde_json::from_value(raw)
            .map_err(|e| CalPilotError::Protocol(format!("invalid resources/read result: {e}")))?;

        let mut values: Vec<Value> = read.contents.iter().map(decode_resource_text).collect();
        debug!(%uri, entries = values.len(), "Resource read");
        Ok(match values.len() {
            1 => values.remove(0),
            _ => Value::Array(values),
        })
    }
}

fn decode_resource_text(contents: &ResourceContents) -> Value {
    let Some(text) = contents.text.as_deref() else {
        return Value::Null;
    };
    let is_json = contents.mime_type.as_deref().map_or(true, |mime| mime.ends_with("json"));
    match is_json.then(|| serde_json::from_str::<Value>(text).ok()).flatten() {
        Some(decoded) => normalize(&decoded),
        None => Value::String(text.to_string()),
    }
}

fn arguments<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| CalPilotError::Internal(format!("encode tool arguments: {e}")))
}

/// Accepts a bare array of events or `{"events": [...]}`.
fn decode_events(value: Value) -> Result<Vec<CalendarEvent>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("events").or_else(|| map.remove("items")) {
            Some(Value::Array(items)) => items,
            _ => {
                if map.get("status").and_then(Value::as_str) == Some("error") {
                    let details = map.get("details").map(Value::to_string).unwrap_or_default();
                    return Err(CalPilotError::Protocol(format!("list_events failed: {details}")));
                }
                return Err(CalPilotError::Protocol("list_events returned no event list".into()));
            }
        },
        other => {
            return Err(CalPilotError::Protocol(format!("unexpected list_events result: {other}")))
        }
    };

    items
        .into_iter()
        .map(|item| {
            let event: CalendarEvent = serde_json::from_value(item)
                .map_err(|e| CalPilotError::MalformedEvent(e.to_string()))?;
            Ok(event)
        })
        .collect()
}
