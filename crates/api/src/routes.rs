//! HTTP surface: `POST /assistant/query` and `GET /health`

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use calpilot_domain::QueryResponse;
use serde::Deserialize;
use tracing::info;

use crate::context::AppContext;
use crate::utils::health::HealthStatus;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/assistant/query", post(submit_query))
        .route("/health", get(health))
        .with_state(context)
}

/// Always answers 200 with the envelope; failures travel in its `error` field.
async fn submit_query(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryResponse> {
    info!(query_len = request.query.len(), "Received assistant query");
    Json(context.pipeline.submit_query(&request.query).await)
}

async fn health(State(context): State<Arc<AppContext>>) -> (StatusCode, Json<HealthStatus>) {
    let status = context.health_check().await;
    let code = if status.is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(status))
}
