#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use calpilot_core::ToolTransport;
use calpilot_domain::{CalPilotError, GoogleConfig, Result as DomainResult};
use calpilot_infra::tools::CalendarTools;
use calpilot_infra::{GoogleCalendarApi, HttpClient, StaticTokenProvider};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use wiremock::MockServer;

pub const EVENTS_PATH: &str = "/calendars/primary/events";

/// Calendar tools wired to `server` with a fixed bearer token.
pub fn tools_for(server: &MockServer) -> CalendarTools {
    let http = HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .max_attempts(1)
        .build()
        .expect("http client should build");
    let config = GoogleConfig { api_base: server.uri(), ..GoogleConfig::default() };
    let api = GoogleCalendarApi::new(http, Arc::new(StaticTokenProvider::new("test-token")), &config);
    CalendarTools::new(api)
}

/// Google-shaped timed event.
pub fn google_event(id: &str, summary: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "summary": summary,
        "start": {"dateTime": start, "timeZone": "UTC"},
        "end": {"dateTime": end, "timeZone": "UTC"},
        "htmlLink": format!("https://calendar.google.com/event?eid={id}")
    })
}

pub fn events_page(items: Vec<Value>) -> Value {
    json!({"kind": "calendar#events", "items": items})
}

/// Client end of an in-process pipe to a [`calpilot_infra::ToolServer`].
pub struct DuplexTransport {
    reader: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: Option<WriteHalf<DuplexStream>>,
}

impl DuplexTransport {
    pub fn new(stream: DuplexStream) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self { reader: BufReader::new(read).lines(), writer: Some(write) }
    }
}

#[async_trait]
impl ToolTransport for DuplexTransport {
    async fn send_line(&mut self, line: &str) -> DomainResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| CalPilotError::Transport("closed".into()))?;
        writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| CalPilotError::Transport(e.to_string()))
    }

    async fn receive_line(&mut self) -> DomainResult<String> {
        match self.reader.next_line().await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(CalPilotError::Transport("channel closed".into())),
            Err(e) => Err(CalPilotError::Transport(e.to_string())),
        }
    }

    async fn close(&mut self) -> DomainResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.map_err(|e| CalPilotError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}
