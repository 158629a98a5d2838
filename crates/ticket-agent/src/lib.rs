//! A ticket assistant that lets a local model work on tracker cards.
//!
//! The crate ships two binaries: `ticket-agent`, an interactive CLI that
//! chats with an Ollama model, and `ticket-agent-server`, an MCP server
//! exposing the tracker tools over stdio. The CLI spawns the server and
//! forwards tool calls to it. Both are thin wrappers, so you can also use
//! the crate as a library.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod mcp;
pub mod repl;
mod session;
pub mod tools;
pub mod tracker;

pub use session::{Session, SessionBuilder, SessionError};

/// Re-exports of [`ticket_agent_core`] crate.
pub mod core {
    pub use ticket_agent_core::*;
}
