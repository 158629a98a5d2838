use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use ticket_agent_core::tool::{Tool, ToolOutput};

use super::tool_error;
use crate::tracker::{TrackerClient, html_to_text};

/// Arguments of the ticket lookup tools.
#[derive(Deserialize, JsonSchema)]
pub struct TicketParameters {
    #[schemars(description = "Numeric id of the tracker card, e.g. 145322.")]
    id: String,
}

/// A tool that fetches a user story and returns its description as text.
pub struct GetUserStoryTool {
    client: TrackerClient,
    parameter_schema: Value,
}

impl GetUserStoryTool {
    /// Creates a new user story tool.
    pub fn new(client: TrackerClient) -> Self {
        Self {
            client,
            parameter_schema: schema_for!(TicketParameters).to_value(),
        }
    }
}

impl Tool for GetUserStoryTool {
    type Input = TicketParameters;

    fn name(&self) -> &str {
        "get_user_story"
    }

    fn description(&self) -> &str {
        "Get the description of a user story by its id."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: TicketParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let client = self.client.clone();
        async move {
            let story =
                client.get_user_story(&input.id).await.map_err(tool_error)?;
            Ok(describe(&input.id, story.description.as_deref()))
        }
    }
}

/// A tool that fetches a bug and returns its description as text.
pub struct GetBugTool {
    client: TrackerClient,
    parameter_schema: Value,
}

impl GetBugTool {
    /// Creates a new bug tool.
    pub fn new(client: TrackerClient) -> Self {
        Self {
            client,
            parameter_schema: schema_for!(TicketParameters).to_value(),
        }
    }
}

impl Tool for GetBugTool {
    type Input = TicketParameters;

    fn name(&self) -> &str {
        "get_bug"
    }

    fn description(&self) -> &str {
        "Get the description of a bug by its id."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: TicketParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let client = self.client.clone();
        async move {
            let bug = client.get_bug(&input.id).await.map_err(tool_error)?;
            Ok(describe(&input.id, bug.description.as_deref()))
        }
    }
}

fn describe(id: &str, description: Option<&str>) -> String {
    let text = description.map(html_to_text).unwrap_or_default();
    if text.is_empty() {
        format!("No description for {id} tp card")
    } else {
        text
    }
}
