use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, RawContent};
use rmcp::service::{RunningService, ServiceError, ServiceExt};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::RoleClient;
use serde_json::{Map, Value};
use ticket_agent_core::tool::{
    Error as ToolError, ToolDefinition, ToolRegistry, ToolResult,
};
use tokio::process::Command;
use tokio::sync::RwLock;
use tokio::time::timeout;

use super::{CONNECT_TIMEOUT, McpError, McpServerConfig};

type RunningClient = RunningService<RoleClient, ()>;

/// A tool registry backed by an MCP server running as a child process.
///
/// The tool list is fetched once during [`connect`](Self::connect) and
/// served from memory afterwards.
pub struct McpToolRegistry {
    service: RwLock<Option<RunningClient>>,
    tools: Vec<ToolDefinition>,
}

impl McpToolRegistry {
    /// Spawns the server, performs the handshake and lists its tools.
    pub async fn connect(config: &McpServerConfig) -> Result<Self, McpError> {
        debug!("spawning MCP server: {} {:?}", config.command, config.args);
        let transport =
            TokioChildProcess::new(Command::new(&config.command).configure(
                |cmd| {
                    cmd.args(&config.args);
                    for (key, value) in &config.env {
                        cmd.env(key, value);
                    }
                },
            ))
            .map_err(|source| McpError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let service: RunningClient = timeout(CONNECT_TIMEOUT, ().serve(transport))
            .await
            .map_err(|_| McpError::ConnectTimeout(CONNECT_TIMEOUT))?
            .map_err(|err| McpError::Handshake(err.to_string()))?;
        if let Some(info) = service.peer_info() {
            info!(
                "connected to MCP server {} {}",
                info.server_info.name, info.server_info.version
            );
        }

        let listed = match service.list_tools(Default::default()).await {
            Ok(listed) => listed,
            Err(err) => {
                let _ = service.cancel().await;
                return Err(err.into());
            }
        };
        let tools = listed
            .tools
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name.to_string(),
                description: tool
                    .description
                    .map(|desc| desc.to_string())
                    .unwrap_or_default(),
                input_schema: Value::Object((*tool.input_schema).clone()),
            })
            .collect::<Vec<_>>();
        debug!("MCP server offers {} tools", tools.len());

        Ok(Self {
            service: RwLock::new(Some(service)),
            tools,
        })
    }

    /// Returns the tools listed during the handshake.
    #[inline]
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Shuts the server down. Later tool calls fail as unavailable.
    pub async fn close(&self) -> Result<(), McpError> {
        let Some(service) = self.service.write().await.take() else {
            return Ok(());
        };
        let reason = service.cancel().await?;
        debug!("MCP client stopped: {reason:?}");
        Ok(())
    }
}

#[async_trait]
impl ToolRegistry for McpToolRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ToolResult>, ToolError> {
        let service = self.service.read().await;
        let Some(service) = service.as_ref() else {
            return Err(ToolError::unavailable()
                .with_reason("the MCP connection is closed"));
        };
        let result = service
            .call_tool(CallToolRequestParam {
                name: name.to_owned().into(),
                arguments: Some(arguments),
            })
            .await
            .map_err(tool_error)?;
        Ok(into_tool_results(result))
    }
}

fn tool_error(err: ServiceError) -> ToolError {
    match err {
        ServiceError::McpError(data) => {
            ToolError::execution_error().with_reason(data.message.to_string())
        }
        err => ToolError::unavailable().with_reason(err.to_string()),
    }
}

fn into_tool_results(result: CallToolResult) -> Vec<ToolResult> {
    let is_error = result.is_error.unwrap_or(false);
    result
        .content
        .into_iter()
        .filter_map(|content| {
            let RawContent::Text(text) = content.raw else {
                warn!("ignoring non-text content returned by a tool");
                return None;
            };
            let text = text.text;
            Some(if is_error {
                ToolResult::error(text)
            } else {
                ToolResult::text(text)
            })
        })
        .collect()
}
