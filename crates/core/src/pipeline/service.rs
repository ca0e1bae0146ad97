//! Assistant pipeline service - request orchestration

use std::sync::Arc;

use calpilot_domain::{CalPilotError, QueryResponse, RequestState, Result};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::checkpoint::{CheckpointStore, Stage};
use super::stages::StageRunner;

/// Runs requests through classify, extract, validate, act and summarize.
///
/// Holds no per-request state: concurrent requests share only the
/// checkpoint store and whatever the stage runner talks to.
pub struct AssistantPipeline {
    stages: StageRunner,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl AssistantPipeline {
    pub fn new(stages: StageRunner, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self { stages, checkpoints }
    }

    /// Process `query` under a fresh request id and return the final state.
    pub async fn run(&self, query: &str) -> Result<RequestState> {
        if query.trim().is_empty() {
            return Err(CalPilotError::InvalidInput("query must not be empty".into()));
        }
        let state = RequestState::new(query);
        info!(request_id = %state.request_id, "Processing assistant request");
        self.run_stages(state, &Stage::ORDER).await
    }

    /// Continue a request from its latest checkpoint.
    ///
    /// Finished requests have no checkpoint left and are rejected.
    pub async fn resume(&self, request_id: Uuid) -> Result<RequestState> {
        let checkpoint = self.checkpoints.load(request_id).await?.ok_or_else(|| {
            CalPilotError::InvalidInput(format!("no checkpoint for request {request_id}"))
        })?;
        info!(%request_id, stage = %checkpoint.stage, "Resuming assistant request");
        self.run_stages(checkpoint.state, checkpoint.stage.remaining_after()).await
    }

    /// Outward entry point. Never fails: errors become the error envelope.
    pub async fn submit_query(&self, query: &str) -> QueryResponse {
        match self.run(query).await {
            Ok(state) => match state.feedback_message {
                Some(message) => QueryResponse::ok(message),
                None => QueryResponse::failed("no response was produced"),
            },
            Err(err) => {
                error!(error = %err, error_type = err.label(), "Assistant request failed");
                QueryResponse::failed(err.to_string())
            }
        }
    }

    #[instrument(skip_all, fields(request_id = %state.request_id))]
    async fn run_stages(&self, mut state: RequestState, stages: &[Stage]) -> Result<RequestState> {
        for &stage in stages {
            state = match stage {
                Stage::Intent => self.stages.classify_intent(state).await?,
                Stage::Data => self.stages.extract_parameters(state).await?,
                Stage::Validation => self.stages.validate(state).await?,
                Stage::Action => self.stages.execute_action(state).await?,
                Stage::Feedback => self.stages.generate_feedback(state).await?,
            };
            self.checkpoints.save(stage, &state).await?;
        }
        Ok(state)
    }
}
