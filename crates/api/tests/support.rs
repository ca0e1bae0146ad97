#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use calpilot_api::{router, AppContext};
use calpilot_core::pipeline::prompts::{FEEDBACK_PROMPT, INTENT_PROMPT, VALIDATION_PROMPT};
use calpilot_core::{GenerationCapability, SessionOpener, ToolTransport};
use calpilot_domain::{CalPilotError, Config, Result as DomainResult};
use serde_json::Value;
use tower::ServiceExt;

/// Capability with fixed answers for intent, extraction and validation.
/// Feedback always fails so the pipeline's plain summary is used.
#[derive(Clone, Default)]
pub struct CannedCapability {
    pub intent: Option<String>,
    pub data: Option<String>,
    pub validation: Option<String>,
}

#[async_trait]
impl GenerationCapability for CannedCapability {
    async fn generate(&self, prompt: &str, _context: &Value) -> DomainResult<String> {
        let reply = if prompt == INTENT_PROMPT {
            &self.intent
        } else if prompt == VALIDATION_PROMPT {
            &self.validation
        } else if prompt == FEEDBACK_PROMPT {
            &None
        } else {
            &self.data
        };
        reply.clone().ok_or_else(|| CalPilotError::Capability("backend unavailable".into()))
    }
}

/// Tool executor that cannot be started.
#[derive(Default)]
pub struct UnreachableTools {
    pub opens: AtomicUsize,
}

impl UnreachableTools {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionOpener for UnreachableTools {
    async fn open(&self) -> DomainResult<Box<dyn ToolTransport>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Err(CalPilotError::Transport("tool server not found".into()))
    }
}

pub fn context_with(
    config: Config,
    capability: CannedCapability,
    tools: Arc<UnreachableTools>,
) -> Arc<AppContext> {
    Arc::new(AppContext::from_parts(config, Arc::new(capability), tools))
}

pub async fn send(context: Arc<AppContext>, request: Request<Body>) -> Response<Body> {
    router(context).oneshot(request).await.expect("router is infallible")
}

pub fn query_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/assistant/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
