//! Request orchestration pipeline

pub mod checkpoint;
pub mod prompts;
pub mod service;
pub mod stages;

pub use checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, Stage};
pub use service::AssistantPipeline;
pub use stages::StageRunner;
