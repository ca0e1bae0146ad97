//! # CalPilot API
//!
//! Application layer - wiring, HTTP routes and entry points.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - The axum router in front of the assistant pipeline
//! - The `calpilot` and `calpilot-tool-server` binaries
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod routes;
pub mod utils;

pub use context::AppContext;
pub use routes::router;
