//! Core logic including the agent loop, the transcript store, tool
//! execution and configurations.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, DEFAULT_SYSTEM_PROMPT, MAX_STEPS_EXCEEDED_RESPONSE,
    NO_RESPONSE, SUMMARY_PROMPT,
};
pub use conversation::{Conversation, TranscriptSource};
