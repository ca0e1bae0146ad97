//! Tool executor transport ports

use async_trait::async_trait;
use calpilot_domain::Result;

/// A bidirectional, line-oriented channel to a tool executor.
///
/// One line carries one JSON-RPC message. Implementations report a closed
/// channel (process exit, broken pipe, EOF) as `Transport` errors.
#[async_trait]
pub trait ToolTransport: Send {
    /// Write one message line.
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Read the next message line, without its terminator.
    async fn receive_line(&mut self) -> Result<String>;

    /// Shut the channel down and release the executor.
    async fn close(&mut self) -> Result<()>;
}

/// Opens fresh transports; one per scoped session.
#[async_trait]
pub trait SessionOpener: Send + Sync {
    async fn open(&self) -> Result<Box<dyn ToolTransport>>;
}
