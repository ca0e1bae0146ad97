use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calpilot_core::conflict::overlaps;
use calpilot_core::{SessionOpener, ToolTransport};
use calpilot_domain::{
    parse_instant, CalPilotError, CalendarEvent, EventAttendee, EventDateTime, EventPatch,
    NewEvent, Result as DomainResult,
};
use serde_json::{json, Value};
use tokio::sync::Barrier;

#[derive(Default)]
struct Shared {
    events: Vec<CalendarEvent>,
    requests: Vec<Value>,
    tool_calls: Vec<String>,
    opens: usize,
    closes: usize,
    created: usize,
    fail_tool: Option<String>,
    list_override: Option<Value>,
}

/// In-process tool executor backed by an in-memory calendar.
///
/// Speaks the same JSON-RPC dialect as the real tool server and records
/// every request, tool call, open and close so tests can assert on them.
#[derive(Clone, Default)]
pub struct FakeCalendar {
    shared: Arc<Mutex<Shared>>,
    create_barrier: Option<Arc<Barrier>>,
}

impl FakeCalendar {
    /// Create a fake seeded with the provided events.
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        let fake = Self::default();
        fake.shared.lock().unwrap().events = events;
        fake
    }

    /// Break the transport when `tool` is called.
    pub fn failing_on(self, tool: &str) -> Self {
        self.shared.lock().unwrap().fail_tool = Some(tool.to_string());
        self
    }

    /// Answer `list_events` with `payload` instead of the stored events.
    pub fn with_list_payload(self, payload: Value) -> Self {
        self.shared.lock().unwrap().list_override = Some(payload);
        self
    }

    /// Hold every `create_event` call until `parties` of them have arrived.
    pub fn with_create_barrier(mut self, parties: usize) -> Self {
        self.create_barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.shared.lock().unwrap().events.clone()
    }

    pub fn tool_calls(&self) -> Vec<String> {
        self.shared.lock().unwrap().tool_calls.clone()
    }

    pub fn mutating_calls(&self) -> usize {
        self.tool_calls().iter().filter(|name| name.as_str() != "list_events").count()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.shared.lock().unwrap().requests.clone()
    }

    pub fn opens(&self) -> usize {
        self.shared.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.shared.lock().unwrap().closes
    }
}

#[async_trait]
impl SessionOpener for FakeCalendar {
    async fn open(&self) -> DomainResult<Box<dyn ToolTransport>> {
        self.shared.lock().unwrap().opens += 1;
        Ok(Box::new(FakeTransport { calendar: self.clone(), outbox: VecDeque::new() }))
    }
}

struct FakeTransport {
    calendar: FakeCalendar,
    outbox: VecDeque<String>,
}

#[async_trait]
impl ToolTransport for FakeTransport {
    async fn send_line(&mut self, line: &str) -> DomainResult<()> {
        let message: Value = serde_json::from_str(line).expect("client sends JSON lines");
        let method = message["method"].as_str().unwrap_or_default().to_string();
        let tool = message["params"]["name"].as_str().unwrap_or_default().to_string();

        if method == "tools/call" && tool == "create_event" {
            if let Some(barrier) = &self.calendar.create_barrier {
                barrier.wait().await;
            }
        }

        let mut shared = self.calendar.shared.lock().unwrap();
        shared.requests.push(message.clone());
        let Some(id) = message.get("id").cloned() else {
            return Ok(());
        };

        let reply = match method.as_str() {
            "initialize" => json!({"jsonrpc": "2.0", "id": id, "result": {
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "fake-calendar", "version": "0.0.0"}
            }}),
            "tools/list" => json!({"jsonrpc": "2.0", "id": id, "result": {"tools": [
                {"name": "list_events", "inputSchema": {"type": "object"}},
                {"name": "create_event", "inputSchema": {"type": "object"}},
                {"name": "update_event", "inputSchema": {"type": "object"}},
                {"name": "delete_event", "inputSchema": {"type": "object"}}
            ]}}),
            "tools/call" => {
                shared.tool_calls.push(tool.clone());
                if shared.fail_tool.as_deref() == Some(tool.as_str()) {
                    return Err(CalPilotError::Transport("broken pipe".into()));
                }
                let payload = shared.handle_tool(&tool, &message["params"]["arguments"]);
                json!({"jsonrpc": "2.0", "id": id, "result": {
                    "content": [{"type": "text", "text": payload.to_string()}],
                    "isError": false
                }})
            }
            other => json!({"jsonrpc": "2.0", "id": id, "error": {
                "code": -32601, "message": format!("Method not found: {other}")
            }}),
        };
        self.outbox.push_back(reply.to_string());
        Ok(())
    }

    async fn receive_line(&mut self) -> DomainResult<String> {
        self.outbox
            .pop_front()
            .ok_or_else(|| CalPilotError::Transport("tool server closed stdout".into()))
    }

    async fn close(&mut self) -> DomainResult<()> {
        self.calendar.shared.lock().unwrap().closes += 1;
        Ok(())
    }
}

impl Shared {
    fn handle_tool(&mut self, tool: &str, arguments: &Value) -> Value {
        match tool {
            "list_events" => {
                if let Some(payload) = &self.list_override {
                    return payload.clone();
                }
                let min = arguments["time_min"].as_str().and_then(|t| parse_instant(t).ok());
                let max = arguments["time_max"].as_str().and_then(|t| parse_instant(t).ok());
                let events: Vec<&CalendarEvent> = self
                    .events
                    .iter()
                    .filter(|event| match (event.window(), min, max) {
                        (Ok((start, end)), Some(min), Some(max)) => overlaps(start, end, min, max),
                        _ => true,
                    })
                    .collect();
                json!({"events": events})
            }
            "create_event" => {
                let new: NewEvent = serde_json::from_value(arguments.clone()).expect("create args");
                self.created += 1;
                let event = CalendarEvent {
                    id: format!("evt-{}", self.created),
                    summary: Some(new.summary),
                    description: new.description,
                    start: EventDateTime::timed(new.start_iso, new.timezone.clone()),
                    end: EventDateTime::timed(new.end_iso, new.timezone),
                    attendees: new
                        .attendees
                        .into_iter()
                        .map(|email| EventAttendee { email, response_status: None })
                        .collect(),
                    html_link: None,
                };
                self.events.push(event.clone());
                json!({"status": "created", "event": event})
            }
            "update_event" => {
                let patch: EventPatch = serde_json::from_value(arguments.clone()).expect("update args");
                let Some(event) = self.events.iter_mut().find(|e| e.id == patch.event_id) else {
                    return json!({"status": "failed", "details": "event not found"});
                };
                if let Some(summary) = patch.summary {
                    event.summary = Some(summary);
                }
                let zone = patch.timezone.unwrap_or_else(|| "UTC".to_string());
                if let Some(start) = patch.start_iso {
                    event.start = EventDateTime::timed(start, zone.clone());
                }
                if let Some(end) = patch.end_iso {
                    event.end = EventDateTime::timed(end, zone);
                }
                json!({"status": "updated", "event": event.clone()})
            }
            "delete_event" => {
                let id = arguments["event_id"].as_str().unwrap_or_default();
                let before = self.events.len();
                self.events.retain(|event| event.id != id);
                if self.events.len() < before {
                    json!({"status": "deleted", "event_id": id})
                } else {
                    json!({"status": "failed", "details": "event not found"})
                }
            }
            other => json!({"status": "error", "details": format!("unknown tool {other}")}),
        }
    }
}

pub fn timed_event(id: &str, summary: &str, start: &str, end: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        summary: Some(summary.to_string()),
        start: EventDateTime::timed(start, "UTC"),
        end: EventDateTime::timed(end, "UTC"),
        ..Default::default()
    }
}
