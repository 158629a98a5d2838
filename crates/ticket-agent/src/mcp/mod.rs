//! Tool exposure over the Model Context Protocol.

mod client;
mod server;

use std::collections::HashMap;
use std::time::Duration;

pub use client::McpToolRegistry;
pub use server::{TicketServer, serve_stdio};

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to start an MCP server speaking over stdio.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct McpServerConfig {
    /// Executable to spawn.
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Extra environment variables of the child process.
    pub env: HashMap<String, String>,
}

impl McpServerConfig {
    /// Creates a configuration that runs `command` without arguments.
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Appends an argument.
    pub fn with_arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets an environment variable of the child process.
    pub fn with_env<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Errors of the MCP client and server.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// The server process can't be started.
    #[error("failed to spawn MCP server `{command}`: {source}")]
    Spawn {
        /// The command that failed.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The protocol handshake did not finish in time.
    #[error("MCP handshake timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// The protocol handshake failed.
    #[error("MCP handshake failed: {0}")]
    Handshake(String),
    /// A request to the peer failed.
    #[error("MCP request failed: {0}")]
    Service(#[from] rmcp::service::ServiceError),
    /// The background service task ended abnormally.
    #[error("MCP service task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
