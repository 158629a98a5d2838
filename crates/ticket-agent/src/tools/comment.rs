use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use ticket_agent_core::tool::{Tool, ToolOutput};

use super::tool_error;
use crate::tracker::{TrackerClient, html_to_text};

/// Arguments of [`AddCommentTool`].
#[derive(Deserialize, JsonSchema)]
pub struct AddCommentParameters {
    #[schemars(description = "Numeric id of the user story or bug.")]
    id: String,
    #[schemars(description = "Comment body, HTML is accepted.")]
    comment: String,
}

/// A tool that posts a comment on a user story or bug.
pub struct AddCommentTool {
    client: TrackerClient,
    parameter_schema: Value,
}

impl AddCommentTool {
    /// Creates a new comment tool.
    pub fn new(client: TrackerClient) -> Self {
        Self {
            client,
            parameter_schema: schema_for!(AddCommentParameters).to_value(),
        }
    }
}

impl Tool for AddCommentTool {
    type Input = AddCommentParameters;

    fn name(&self) -> &str {
        "add_comment"
    }

    fn description(&self) -> &str {
        "Add a comment to a user story or bug by its id."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: AddCommentParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let client = self.client.clone();
        async move {
            let comment = client
                .add_comment(&input.id, &input.comment)
                .await
                .map_err(tool_error)?;
            let stored = comment.description.as_deref().unwrap_or(&input.comment);
            Ok(format!(
                "Comment {} added to {}:\n{}",
                comment.id,
                input.id,
                html_to_text(stored)
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use ticket_agent_core::tool::{ErrorKind, LocalRegistry};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::tracker::TrackerConfig;

    fn registry(server: &MockServer, owner_id: Option<u64>) -> LocalRegistry {
        let config = TrackerConfig::with_token("t")
            .with_base_url(format!("{}/api/", server.uri()))
            .with_owner_id(owner_id);
        let client = TrackerClient::new(config).unwrap();
        LocalRegistry::new().with_tool(AddCommentTool::new(client))
    }

    fn args(id: &str, comment: &str) -> serde_json::Map<String, Value> {
        json!({ "id": id, "comment": comment })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/Comments"))
            .and(body_partial_json(json!({ "General": { "Id": 145155 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Id": 501,
                "Description": "<div><h3>Test cases</h3><p>1. Open</p></div>"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = registry(&server, Some(3))
            .execute("add_comment", args("145155", "<div>ignored</div>"))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(output, "Comment 501 added to 145155:\nTest cases\n1. Open");
    }

    #[tokio::test]
    async fn test_missing_owner_is_unavailable() {
        let server = MockServer::start().await;
        let err = registry(&server, None)
            .execute("add_comment", args("1", "hi"))
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_missing_comment_is_invalid_input() {
        let server = MockServer::start().await;
        let args = json!({ "id": "1" }).as_object().cloned().unwrap();
        let err = registry(&server, Some(3))
            .execute("add_comment", args)
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
