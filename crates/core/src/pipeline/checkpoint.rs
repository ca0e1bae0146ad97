//! Per-request checkpoints
//!
//! The orchestrator saves the state after every stage, keyed by request id.
//! [`InMemoryCheckpointStore`] only holds requests that are still in flight:
//! the final checkpoint of a request removes its entry.

use async_trait::async_trait;
use calpilot_domain::{impl_domain_enum_conversions, RequestState, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Intent,
    Data,
    Validation,
    Action,
    Feedback,
}

impl_domain_enum_conversions!(Stage {
    Intent => "intent",
    Data => "data",
    Validation => "validation",
    Action => "action",
    Feedback => "feedback",
});

impl Stage {
    pub const ORDER: [Stage; 5] =
        [Stage::Intent, Stage::Data, Stage::Validation, Stage::Action, Stage::Feedback];

    /// Stages that still have to run once `self` has completed.
    pub fn remaining_after(self) -> &'static [Stage] {
        let done = Self::ORDER.iter().position(|stage| *stage == self).map_or(0, |i| i + 1);
        &Self::ORDER[done..]
    }
}

/// State as of the end of `stage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub stage: Stage,
    pub state: RequestState,
}

impl Checkpoint {
    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Feedback
    }
}

/// Storage for per-request checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Record `state` as the latest checkpoint for its request. Saving the
    /// terminal stage may drop the request from the store.
    async fn save(&self, stage: Stage, state: &RequestState) -> Result<()>;

    /// Latest checkpoint for `request_id`, if any.
    async fn load(&self, request_id: Uuid) -> Result<Option<Checkpoint>>;
}

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: DashMap<Uuid, Checkpoint>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, stage: Stage, state: &RequestState) -> Result<()> {
        let checkpoint = Checkpoint { stage, state: state.clone() };
        if checkpoint.is_complete() {
            self.checkpoints.remove(&state.request_id);
        } else {
            self.checkpoints.insert(state.request_id, checkpoint);
        }
        Ok(())
    }

    async fn load(&self, request_id: Uuid) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoints.get(&request_id).map(|entry| entry.value().clone()))
    }
}
