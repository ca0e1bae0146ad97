//! Child-process transport for the tool session
//!
//! Spawns the tool server and speaks JSON-RPC lines over its stdin/stdout.
//! The child inherits stderr so its logs reach the parent's log stream.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use calpilot_core::{CredentialProvider, SessionOpener, ToolTransport};
use calpilot_domain::constants::ACCESS_TOKEN_ENV;
use calpilot_domain::{CalPilotError, Result, ToolServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::errors::InfraError;

/// How long `close` waits for the child to exit after stdin is closed.
const EXIT_GRACE: Duration = Duration::from_secs(5);

pub struct StdioTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl StdioTransport {
    /// Spawn `command` with piped stdio. The child is killed if the
    /// transport is dropped without `close`.
    pub fn spawn(command: &mut Command) -> Result<Self> {
        command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::inherit()).kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| CalPilotError::Transport(format!("failed to spawn tool server: {e}")))?;
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CalPilotError::Transport("tool server stdout unavailable".into()))?;
        debug!(pid = ?child.id(), "Spawned tool server");

        Ok(Self { child, stdin, stdout: BufReader::new(stdout).lines() })
    }
}

#[async_trait]
impl ToolTransport for StdioTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CalPilotError::Transport("tool server stdin is closed".into()))?;
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        stdin.write_all(framed.as_bytes()).await.map_err(InfraError::from)?;
        stdin.flush().await.map_err(InfraError::from)?;
        Ok(())
    }

    async fn receive_line(&mut self) -> Result<String> {
        loop {
            match self.stdout.next_line().await.map_err(InfraError::from)? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(line),
                None => {
                    let status = self.child.try_wait().ok().flatten();
                    return Err(CalPilotError::Transport(match status {
                        Some(status) => format!("tool server exited ({status})"),
                        None => "tool server closed stdout".to_string(),
                    }));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // EOF on stdin asks the server to exit on its own.
        drop(self.stdin.take());
        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "Tool server exited");
                Ok(())
            }
            Ok(Err(err)) => Err(InfraError::from(err).into()),
            Err(_) => {
                warn!("Tool server ignored EOF; killing it");
                self.child.kill().await.map_err(InfraError::from)?;
                Ok(())
            }
        }
    }
}

/// Spawns a fresh tool server per session.
///
/// With `forward_access_token` the opener fetches a token first and hands it
/// to the child through `CALPILOT_GOOGLE_ACCESS_TOKEN`.
pub struct StdioSessionOpener {
    config: ToolServerConfig,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl StdioSessionOpener {
    pub fn new(config: ToolServerConfig, credentials: Option<Arc<dyn CredentialProvider>>) -> Self {
        Self { config, credentials }
    }
}

#[async_trait]
impl SessionOpener for StdioSessionOpener {
    async fn open(&self) -> Result<Box<dyn ToolTransport>> {
        let mut command = Command::new(&self.config.command);
        command.args(&self.config.args);

        if self.config.forward_access_token {
            if let Some(credentials) = &self.credentials {
                let token = credentials.access_token().await?;
                command.env(ACCESS_TOKEN_ENV, token);
            }
        }

        info!(command = %self.config.command, "Opening tool session");
        Ok(Box::new(StdioTransport::spawn(&mut command)?))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_lines_through_a_child() {
        let mut command = Command::new("cat");
        let mut transport = StdioTransport::spawn(&mut command).expect("spawn cat");

        transport.send_line(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await.unwrap();
        let echoed = transport.receive_line().await.unwrap();
        assert_eq!(echoed, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);

        transport.close().await.expect("close");
        let err = transport.send_line("{}").await.unwrap_err();
        assert!(matches!(err, CalPilotError::Transport(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_a_transport_error() {
        let opener = StdioSessionOpener::new(
            ToolServerConfig {
                command: "/nonexistent/calpilot-tool-server".into(),
                forward_access_token: false,
                ..ToolServerConfig::default()
            },
            None,
        );
        let err = opener.open().await.err().expect("spawn failure");
        assert!(matches!(err, CalPilotError::Transport(_)));
    }

    #[tokio::test]
    async fn early_exit_is_reported_on_receive() {
        let mut command = Command::new("true");
        let mut transport = StdioTransport::spawn(&mut command).expect("spawn true");
        let err = transport.receive_line().await.unwrap_err();
        assert!(matches!(err, CalPilotError::Transport(_)));
    }
}
