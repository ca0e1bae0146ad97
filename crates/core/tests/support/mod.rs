//! Shared test helpers for `calpilot-core` integration tests.
//!
//! In-process fakes for the tool executor and the generation capability so
//! pipeline tests can focus on behaviour instead of plumbing.

#![allow(dead_code)]

pub mod calendar;
pub mod generation;
pub mod transport;
