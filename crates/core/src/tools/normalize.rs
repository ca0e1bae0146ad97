//! Normalization of remote tool results into plain JSON.
//!
//! Tool executors answer with content blocks, structured payloads, JSON
//! encoded as text, or plain values. [`RemotePayload`] is the closed set of
//! shapes we distinguish; every JSON value maps onto exactly one of them, so
//! normalization never fails. Plain JSON is already normal: mappings,
//! sequences and primitives come back unchanged. Only the content blocks of
//! a `tools/call` envelope are decoded or degraded.

use serde_json::{Map, Value};

use super::protocol::ToolCallResult;

const BLOCK_TYPES: [&str; 5] = ["text", "image", "audio", "resource", "resource_link"];

/// The shapes a remote result can take.
#[derive(Debug, Clone, PartialEq)]
pub enum RemotePayload {
    /// `null`, booleans, numbers and strings pass through.
    Primitive(Value),
    /// Arrays, normalized element-wise.
    Sequence(Vec<RemotePayload>),
    /// Objects with normalized field values.
    StructuredRecord(Map<String, Value>),
    /// Text blocks that do not hold JSON.
    TextFallback(String),
    /// Binary or otherwise opaque content, rendered as a short description.
    OpaqueFallback(String),
}

impl RemotePayload {
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Sequence(items.iter().map(Self::classify).collect()),
            Value::Object(map) => Self::StructuredRecord(
                map.iter().map(|(key, value)| (key.clone(), normalize(value))).collect(),
            ),
            primitive => Self::Primitive(primitive.clone()),
        }
    }

    /// Classify a `tools/call` result.
    ///
    /// `structuredContent` wins; otherwise text blocks are joined and decoded
    /// as JSON when possible.
    pub fn from_tool_result(result: &ToolCallResult) -> Self {
        if let Some(structured) = &result.structured_content {
            return Self::classify(structured);
        }

        if result.content.iter().all(is_text_block) {
            let text = result.text();
            return match serde_json::from_str::<Value>(&text) {
                Ok(decoded) => Self::classify(&decoded),
                Err(_) => Self::TextFallback(text),
            };
        }

        match result.content.as_slice() {
            [single] => Self::classify_block(single),
            blocks => Self::Sequence(blocks.iter().map(Self::classify_block).collect()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Primitive(value) => value,
            Self::Sequence(items) => {
                Value::Array(items.into_iter().map(Self::into_value).collect())
            }
            Self::StructuredRecord(map) => Value::Object(map),
            Self::TextFallback(text) | Self::OpaqueFallback(text) => Value::String(text),
        }
    }

    fn classify_block(block: &Value) -> Self {
        let kind = block.get("type").and_then(Value::as_str);
        match kind {
            Some("text") => match block.get("text").and_then(Value::as_str) {
                Some(text) => Self::TextFallback(text.to_string()),
                None => Self::OpaqueFallback(block.to_string()),
            },
            Some("image" | "audio") => {
                let mime = block.get("mimeType").and_then(Value::as_str).unwrap_or("binary");
                Self::OpaqueFallback(format!("[{mime} content]"))
            }
            _ => Self::OpaqueFallback(block.to_string()),
        }
    }
}

/// Normalize any JSON value.
pub fn normalize(value: &Value) -> Value {
    RemotePayload::classify(value).into_value()
}

/// Normalize a `tools/call` result.
pub fn normalize_tool_result(result: &ToolCallResult) -> Value {
    RemotePayload::from_tool_result(result).into_value()
}

fn is_text_block(block: &Value) -> bool {
    block.get("type").and_then(Value::as_str) == Some("text")
        && block.get("text").is_some_and(Value::is_string)
}

/// `{"content": [blocks...], "isError"?, "structuredContent"?}`
pub fn is_tool_envelope(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    let Some(Value::Array(content)) = map.get("content") else {
        return false;
    };
    let known_keys =
        map.keys().all(|k| matches!(k.as_str(), "content" | "structuredContent" | "isError" | "_meta"));
    let blocks = content.iter().all(|block| {
        block
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| BLOCK_TYPES.contains(&kind))
    });
    known_keys && blocks
}
