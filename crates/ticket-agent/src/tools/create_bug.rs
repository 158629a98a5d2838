use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use ticket_agent_core::tool::{Error as ToolError, Tool, ToolOutput};

use super::tool_error;
use crate::tracker::TrackerClient;

/// Arguments of [`CreateBugTool`].
#[derive(Deserialize, JsonSchema)]
pub struct CreateBugParameters {
    #[schemars(description = "Short title of the bug.")]
    name: String,
    #[schemars(description = "Steps to reproduce, expected and actual \
                              behaviour. HTML is accepted.")]
    description: String,
    #[schemars(description = "Numeric id of the user story the bug was \
                              found in, if any.")]
    user_story_id: Option<String>,
}

/// A tool that creates a bug in the configured project.
pub struct CreateBugTool {
    client: TrackerClient,
    parameter_schema: Value,
}

impl CreateBugTool {
    /// Creates a new bug creation tool.
    pub fn new(client: TrackerClient) -> Self {
        Self {
            client,
            parameter_schema: schema_for!(CreateBugParameters).to_value(),
        }
    }
}

impl Tool for CreateBugTool {
    type Input = CreateBugParameters;

    fn name(&self) -> &str {
        "create_bug"
    }

    fn description(&self) -> &str {
        "Create a bug, optionally linked to the user story it was found in."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: CreateBugParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let client = self.client.clone();
        async move {
            let name = input.name.trim();
            if name.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`name` must not be empty"));
            }
            let bug = client
                .create_bug(
                    name,
                    &input.description,
                    input.user_story_id.as_deref(),
                )
                .await
                .map_err(tool_error)?;
            Ok(format!("Created bug {}: {}", bug.id, name))
        }
    }
}
