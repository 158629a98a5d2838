use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo,
    Tool,
};
use rmcp::service::{RequestContext, ServiceExt};
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::Value;
use ticket_agent_core::tool::LocalRegistry;

use super::McpError;

const INSTRUCTIONS: &str = "Tools for reading user stories and bugs from \
the project tracker, commenting on them and filing new bugs.";

/// An MCP server exposing the tools of a [`LocalRegistry`].
#[derive(Clone)]
pub struct TicketServer {
    registry: Arc<LocalRegistry>,
}

impl TicketServer {
    /// Creates a server over the given tools.
    pub fn new(registry: LocalRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    fn tools(&self) -> Vec<Tool> {
        self.registry
            .definitions()
            .into_iter()
            .map(|def| {
                let schema = match def.input_schema {
                    Value::Object(schema) => schema,
                    _ => JsonObject::new(),
                };
                Tool::new(def.name, def.description, Arc::new(schema))
            })
            .collect()
    }

    async fn call(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ErrorData> {
        let name: &str = &request.name;
        let arguments = request.arguments.unwrap_or_default();
        let Some(execution) = self.registry.execute(name, arguments) else {
            return Err(ErrorData::invalid_params(
                format!("Tool not found: {name}"),
                None,
            ));
        };
        match execution.await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(err) => {
                warn!("tool {name} failed: {err}");
                Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
            }
        }
    }
}

impl ServerHandler for TicketServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_owned()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        debug!("call_tool: {}", request.name);
        self.call(request).await
    }
}

/// Serves the tools over stdin and stdout until the client disconnects.
pub async fn serve_stdio(registry: LocalRegistry) -> Result<(), McpError> {
    let service = TicketServer::new(registry)
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|err| McpError::Handshake(err.to_string()))?;
    info!("ticket server ready");
    let reason = service.waiting().await?;
    info!("ticket server stopped: {reason:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rmcp::model::RawContent;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use ticket_agent_core::tool::{Error as ToolError, ToolOutput};

    use super::*;

    #[derive(Deserialize, JsonSchema)]
    struct EchoInput {
        text: String,
    }

    struct Echo(Value);

    impl ticket_agent_core::tool::Tool for Echo {
        type Input = EchoInput;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text back."
        }

        fn parameter_schema(&self) -> &Value {
            &self.0
        }

        fn execute(
            &self,
            input: EchoInput,
        ) -> impl Future<Output = ToolOutput> + Send + 'static {
            async move {
                if input.text.is_empty() {
                    return Err(ToolError::invalid_input().with_reason("empty"));
                }
                Ok(input.text)
            }
        }
    }

    fn server() -> TicketServer {
        let schema = schemars::schema_for!(EchoInput).to_value();
        TicketServer::new(LocalRegistry::new().with_tool(Echo(schema)))
    }

    fn request(name: &str, arguments: Value) -> CallToolRequestParam {
        CallToolRequestParam {
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
        }
    }

    fn first_text(result: &CallToolResult) -> &str {
        match &result.content[0].raw {
            RawContent::Text(text) => &text.text,
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn test_tools() {
        let tools = server().tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
        assert_eq!(tools[0].input_schema["type"], json!("object"));
        assert!(tools[0].input_schema["properties"].get("text").is_some());
    }

    #[tokio::test]
    async fn test_call_success() {
        let result = server()
            .call(request("echo", json!({ "text": "hi" })))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "hi");
    }

    #[tokio::test]
    async fn test_call_tool_error() {
        let result = server()
            .call(request("echo", json!({ "text": "" })))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "Invalid input: empty");
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let err = server()
            .call(request("deploy", json!({})))
            .await
            .unwrap_err();
        assert!(err.message.contains("deploy"));
    }
}
