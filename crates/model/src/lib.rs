//! An abstraction layer for chat models that can request tool calls.
//!
//! This crate establishes the protocol the agent uses to talk to a model
//! gateway, so that the agent loop stays independent from the concrete
//! HTTP API behind it.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
