//! # CalPilot Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The interval conflict checker
//! - Port/adapter interfaces (traits) for generation, credentials, tool
//!   transports and checkpoints
//! - The JSON-RPC tool session and typed tool client
//! - The stage functions and the assistant pipeline
//!
//! ## Architecture Principles
//! - Only depends on `calpilot-domain`
//! - No HTTP, process or filesystem code
//! - All external dependencies via traits

pub mod conflict;
pub mod pipeline;
pub mod tools;

// Infrastructure ports
pub mod credential_ports;
pub mod generation_ports;

pub use conflict::{detect_conflict, detect_conflict_excluding};
pub use credential_ports::CredentialProvider;
pub use generation_ports::GenerationCapability;
pub use pipeline::{AssistantPipeline, CheckpointStore, InMemoryCheckpointStore, Stage, StageRunner};
pub use tools::{SessionOpener, ToolClient, ToolClientOptions, ToolTransport};
