//! Tool call supports.

mod catalog;
mod error;
mod executor;
mod object;
mod registry;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use ticket_agent_model::ToolResultKind;

pub use catalog::ToolCatalog;
pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;
pub use executor::aggregate_results;
pub use registry::LocalRegistry;

/// The output of a local tool execution.
pub type ToolOutput = Result<String, Error>;

/// One block of content returned by a tool call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolResult {
    /// Whether the block describes a failure.
    pub kind: ToolResultKind,
    /// Model-readable payload.
    pub text: String,
}

impl ToolResult {
    /// Creates a text block.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            kind: ToolResultKind::Text,
            text: text.into(),
        }
    }

    /// Creates an error block.
    #[inline]
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self {
            kind: ToolResultKind::Error,
            text: text.into(),
        }
    }

    /// Returns `true` if this block describes a failure.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.kind == ToolResultKind::Error
    }
}

/// Describes a tool offered by a registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDefinition {
    /// Name of the tool, unique within a registry.
    pub name: String,
    /// Human readable description.
    pub description: String,
    /// JSON schema of the arguments object.
    pub input_schema: Value,
}

/// A source of tools that can list and execute them by name.
///
/// The registry validates the arguments, the agent passes them through as
/// the model produced them.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Lists the tools this registry offers.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, Error>;

    /// Calls a tool and returns its content blocks.
    ///
    /// A tool that ran but failed may either return an error or blocks of
    /// the error kind.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ToolResult>, Error>;
}

/// A tool that runs in-process.
///
/// Implementations of this trait should be stateless, and may not maintain
/// any internal state.
///
/// The tool can be context-aware, meaning it can access additional
/// information about the current execution context, such as the tracker
/// client or the current user. To do this, make the context an immutable
/// state of the tool, which can be set during initialization, and copy it
/// when executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of
    /// `self`, and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolOutput> + Send + 'static;
}
