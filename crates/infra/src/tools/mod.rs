//! Tool executor plumbing
//!
//! Client side: [`StdioSessionOpener`] spawns the tool server per session.
//! Server side: [`ToolServer`] serves [`CalendarTools`] over stdio.

pub mod calendar_tools;
pub mod server;
pub mod stdio;

pub use calendar_tools::CalendarTools;
pub use server::{ToolHandler, ToolServer};
pub use stdio::{StdioSessionOpener, StdioTransport};
