//! Tracker tools served to the model.

mod comment;
mod create_bug;
mod ticket;

use ticket_agent_core::tool::{Error as ToolError, LocalRegistry};

pub use comment::AddCommentTool;
pub use create_bug::CreateBugTool;
pub use ticket::{GetBugTool, GetUserStoryTool};

use crate::tracker::{TrackerClient, TrackerError};

/// Creates a registry with every tracker tool, sharing one client.
pub fn tracker_registry(client: TrackerClient) -> LocalRegistry {
    LocalRegistry::new()
        .with_tool(GetUserStoryTool::new(client.clone()))
        .with_tool(GetBugTool::new(client.clone()))
        .with_tool(AddCommentTool::new(client.clone()))
        .with_tool(CreateBugTool::new(client))
}

fn tool_error(err: TrackerError) -> ToolError {
    match err {
        TrackerError::InvalidId(_) => {
            ToolError::invalid_input().with_reason(err.to_string())
        }
        TrackerError::MissingConfig(_) => {
            ToolError::unavailable().with_reason(err.to_string())
        }
        _ => ToolError::execution_error().with_reason(err.to_string()),
    }
}
