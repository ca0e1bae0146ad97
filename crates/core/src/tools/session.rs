//! A single JSON-RPC session with a tool executor.
//!
//! The session owns the transport, the request-id counter and the handshake
//! state. Calls are not pipelined: the channel sits behind an async mutex and
//! each call holds it from write until its response arrives, so at most one
//! request is outstanding at a time.

use std::time::Duration;

use calpilot_domain::constants::{CLIENT_NAME, MCP_PROTOCOL_VERSION};
use calpilot_domain::{CalPilotError, Result};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ports::ToolTransport;
use super::protocol::{
    Implementation, InitializeParams, InitializeResult, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, METHOD_INITIALIZE, METHOD_INITIALIZED,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, handshake not yet done.
    Connected,
    /// Handshake done; tool calls allowed.
    Ready,
    /// Transport closed; nothing further is allowed.
    Closed,
}

struct Channel {
    transport: Box<dyn ToolTransport>,
    state: SessionState,
    next_id: u64,
}

pub struct ToolSession {
    channel: Mutex<Channel>,
    call_timeout: Duration,
}

impl ToolSession {
    pub fn new(transport: Box<dyn ToolTransport>, call_timeout: Duration) -> Self {
        Self {
            channel: Mutex::new(Channel { transport, state: SessionState::Connected, next_id: 1 }),
            call_timeout,
        }
    }

    pub async fn state(&self) -> SessionState {
        self.channel.lock().await.state
    }

    /// Run the `initialize` / `notifications/initialized` handshake.
    ///
    /// Legal exactly once per session.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let mut channel = self.channel.lock().await;
        match channel.state {
            SessionState::Connected => {}
            SessionState::Ready => {
                return Err(CalPilotError::Protocol("session already initialized".into()))
            }
            SessionState::Closed => return Err(closed()),
        }

        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation {
                name: CLIENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let params = serde_json::to_value(params)
            .map_err(|e| CalPilotError::Internal(format!("encode initialize params: {e}")))?;

        let result = self.call_locked(&mut channel, METHOD_INITIALIZE, Some(params)).await?;
        let result: InitializeResult = serde_json::from_value(result)
            .map_err(|e| CalPilotError::Protocol(format!("invalid initialize result: {e}")))?;

        if result.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                server_version = %result.protocol_version,
                client_version = MCP_PROTOCOL_VERSION,
                "Tool server negotiated a different protocol version"
            );
        }

        let note = JsonRpcNotification::new(METHOD_INITIALIZED, None);
        send(&mut channel, &note).await?;
        channel.state = SessionState::Ready;

        info!(
            server = %result.server_info.name,
            server_version = %result.server_info.version,
            protocol_version = %result.protocol_version,
            "Tool session initialized"
        );
        Ok(result)
    }

    /// Send a request and wait for its result.
    ///
    /// Fails with `SessionNotReady` before the handshake, `Transport` when
    /// the channel breaks or the call times out, and `Protocol` when the
    /// peer answers with a JSON-RPC error.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let mut channel = self.channel.lock().await;
        match channel.state {
            SessionState::Ready => {}
            SessionState::Connected => return Err(CalPilotError::SessionNotReady),
            SessionState::Closed => return Err(closed()),
        }
        self.call_locked(&mut channel, method, params).await
    }

    /// Close the transport. Later calls are no-ops.
    pub async fn close(&self) -> Result<()> {
        let mut channel = self.channel.lock().await;
        if channel.state == SessionState::Closed {
            return Ok(());
        }
        channel.state = SessionState::Closed;
        debug!("Closing tool session");
        channel.transport.close().await
    }

    async fn call_locked(
        &self,
        channel: &mut Channel,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        let id = channel.next_id;
        channel.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        send(channel, &request).await?;
        debug!(request_id = id, method, "Sent tool request");

        let response = tokio::time::timeout(self.call_timeout, wait_for(channel, id))
            .await
            .map_err(|_| {
                CalPilotError::Transport(format!(
                    "{method} timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })??;

        if let Some(error) = response.error {
            return Err(CalPilotError::Protocol(format!(
                "{method} failed ({}): {}",
                error.code, error.message
            )));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

async fn send<T: serde::Serialize>(channel: &mut Channel, message: &T) -> Result<()> {
    let line = serde_json::to_string(message)
        .map_err(|e| CalPilotError::Internal(format!("encode JSON-RPC message: {e}")))?;
    channel.transport.send_line(&line).await
}

/// Read until the response for `id`, skipping anything else.
async fn wait_for(channel: &mut Channel, id: u64) -> Result<JsonRpcResponse> {
    loop {
        let line = channel.transport.receive_line().await?;
        if line.trim().is_empty() {
            continue;
        }
        match JsonRpcMessage::parse_line(&line) {
            Ok(JsonRpcMessage::Response(response)) if response.id.as_u64() == Some(id) => {
                return Ok(response);
            }
            Ok(JsonRpcMessage::Response(response)) => {
                warn!(expected = id, received = %response.id, "Received response for unknown request ID");
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                debug!(method = %notification.method, "Received tool server notification");
            }
            Ok(JsonRpcMessage::Request(request)) => {
                warn!(method = %request.method, "Ignoring request from tool server");
            }
            Err(error) => {
                warn!(code = error.code, error = %error.message, "Skipping undecodable line from tool server");
            }
        }
    }
}

fn closed() -> CalPilotError {
    CalPilotError::Transport("tool session is closed".into())
}
