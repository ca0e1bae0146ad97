//! Remote tool invocation
//!
//! The calendar is mutated through a tool executor reached over a JSON-RPC
//! session. [`ToolClient::scoped`] opens a session, performs the handshake,
//! runs the caller's operations and always closes the session afterwards.

pub mod client;
pub mod normalize;
pub mod ports;
pub mod protocol;
pub mod session;

pub use client::{ToolClient, ToolClientOptions};
pub use normalize::{normalize, normalize_tool_result, RemotePayload};
pub use ports::{SessionOpener, ToolTransport};
pub use session::{SessionState, ToolSession};
