use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calpilot_core::ToolTransport;
use calpilot_domain::{CalPilotError, Result as DomainResult};
use serde_json::Value;

/// Transport that replays canned lines regardless of what is sent.
///
/// When the script runs out it either reports EOF or, with `hang_when_empty`,
/// never answers.
pub struct ScriptedTransport {
    replies: VecDeque<String>,
    sent: Arc<Mutex<Vec<Value>>>,
    closes: Arc<AtomicUsize>,
    hang_when_empty: bool,
}

#[derive(Clone, Default)]
pub struct TransportLog {
    sent: Arc<Mutex<Vec<Value>>>,
    closes: Arc<AtomicUsize>,
}

impl TransportLog {
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ScriptedTransport {
    pub fn new(replies: &[&str]) -> (Self, TransportLog) {
        let log = TransportLog::default();
        let transport = Self {
            replies: replies.iter().map(|line| line.to_string()).collect(),
            sent: Arc::clone(&log.sent),
            closes: Arc::clone(&log.closes),
            hang_when_empty: false,
        };
        (transport, log)
    }

    pub fn hanging(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }
}

#[async_trait]
impl ToolTransport for ScriptedTransport {
    async fn send_line(&mut self, line: &str) -> DomainResult<()> {
        let value = serde_json::from_str(line).expect("client sends JSON lines");
        self.sent.lock().unwrap().push(value);
        Ok(())
    }

    async fn receive_line(&mut self) -> DomainResult<String> {
        match self.replies.pop_front() {
            Some(line) => Ok(line),
            None if self.hang_when_empty => futures::future::pending().await,
            None => Err(CalPilotError::Transport("unexpected EOF".into())),
        }
    }

    async fn close(&mut self) -> DomainResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub const INIT_REPLY: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"scripted","version":"1.0"}}}"#;
