//! Newline-delimited JSON-RPC tool server
//!
//! Serves a [`ToolHandler`] over any async line stream: stdin/stdout in the
//! `calpilot-tool-server` binary, an in-memory duplex pipe in tests. Stdout
//! is the protocol channel, so everything else goes to the log.

use async_trait::async_trait;
use calpilot_core::tools::protocol::{
    Implementation, InitializeParams, InitializeResult, JsonRpcError, JsonRpcMessage,
    JsonRpcRequest, JsonRpcResponse, ResourceContents, ResourceDescriptor, ResourceReadParams,
    ResourcesListResult, ResourcesReadResult, ToolCallParams, ToolCallResult, ToolDescriptor,
    ToolsListResult, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_PING, METHOD_RESOURCES_LIST,
    METHOD_RESOURCES_READ, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use calpilot_domain::constants::{MCP_PROTOCOL_VERSION, TOOL_SERVER_NAME};
use calpilot_domain::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::errors::InfraError;

/// The tools and resources a [`ToolServer`] exposes.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Run `name`; the returned payload becomes the structured result.
    ///
    /// Errors are reported to the caller as `isError` results, not as
    /// JSON-RPC errors.
    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value>;

    fn resources(&self) -> Vec<ResourceDescriptor> {
        Vec::new()
    }

    /// `Ok(None)` when `uri` is not one of [`Self::resources`].
    async fn read_resource(&self, _uri: &str) -> Result<Option<ResourceContents>> {
        Ok(None)
    }
}

pub struct ToolServer<H> {
    handler: H,
    initialized: bool,
}

impl<H: ToolHandler> ToolServer<H> {
    pub fn new(handler: H) -> Self {
        Self { handler, initialized: false }
    }

    /// Serve until the reader reaches EOF.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.map_err(InfraError::from)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(line).await {
                write_message(&mut writer, &response).await?;
            }
        }
        info!("Tool client closed the channel");
        Ok(())
    }

    /// Serve over the process's stdin/stdout.
    pub async fn serve_stdio(&mut self) -> Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
    }

    /// Handle one raw line; `None` for notifications and stray responses.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        match JsonRpcMessage::parse_line(line) {
            Ok(JsonRpcMessage::Request(request)) => Some(self.handle_request(request).await),
            Ok(JsonRpcMessage::Notification(notification)) => {
                if notification.method == METHOD_INITIALIZED {
                    debug!("Client confirmed initialization");
                } else {
                    debug!(method = %notification.method, "Ignoring notification");
                }
                None
            }
            Ok(JsonRpcMessage::Response(response)) => {
                debug!(id = %response.id, "Ignoring unsolicited response");
                None
            }
            Err(error) => {
                warn!(code = error.code, message = %error.message, "Rejecting malformed message");
                Some(JsonRpcResponse::failure(Value::Null, error))
            }
        }
    }

    async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest { id, method, params, .. } = request;
        let outcome = match method.as_str() {
            METHOD_INITIALIZE => self.initialize(params),
            METHOD_PING => Ok(json!({})),
            _ if !self.initialized => Err(JsonRpcError::not_initialized()),
            METHOD_TOOLS_LIST => to_value(&ToolsListResult { tools: self.handler.tools() }),
            METHOD_TOOLS_CALL => self.call_tool(params).await,
            METHOD_RESOURCES_LIST => {
                to_value(&ResourcesListResult { resources: self.handler.resources() })
            }
            METHOD_RESOURCES_READ => self.read_resource(params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(%method, code = error.code, "Request failed");
                JsonRpcResponse::failure(id, error)
            }
        }
    }

    fn initialize(&mut self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: InitializeParams = decode_params(params)?;
        if params.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                requested = %params.protocol_version,
                supported = MCP_PROTOCOL_VERSION,
                "Client requested a different protocol version"
            );
        }
        self.initialized = true;
        info!(client = %params.client_info.name, version = %params.client_info.version, "Tool session initialized");

        to_value(&InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({"tools": {}, "resources": {}}),
            server_info: Implementation {
                name: TOOL_SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: ToolCallParams = decode_params(params)?;
        if !self.handler.tools().iter().any(|tool| tool.name == params.name) {
            return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)));
        }

        let arguments = match params.arguments {
            Value::Null => json!({}),
            Value::Object(_) => params.arguments,
            _ => return Err(JsonRpcError::invalid_params("tool arguments must be an object")),
        };

        let result = match self.handler.call_tool(&params.name, &arguments).await {
            Ok(payload) => ToolCallResult::structured(payload),
            Err(err) => {
                warn!(tool = %params.name, error = %err, kind = err.label(), "Tool call failed");
                ToolCallResult::error(err.to_string())
            }
        };
        to_value(&result)
    }

    async fn read_resource(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: ResourceReadParams = decode_params(params)?;
        match self.handler.read_resource(&params.uri).await {
            Ok(Some(contents)) => to_value(&ResourcesReadResult { contents: vec![contents] }),
            Ok(None) => Err(JsonRpcError::invalid_params(format!("Unknown resource: {}", params.uri))),
            Err(err) => Err(JsonRpcError::internal(err.to_string())),
        }
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    let mut line = serde_json::to_string(response).map_err(InfraError::from)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await.map_err(InfraError::from)?;
    writer.flush().await.map_err(InfraError::from)?;
    Ok(())
}
