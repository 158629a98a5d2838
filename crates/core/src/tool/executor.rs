use std::sync::Arc;
use std::time::Duration;

use ticket_agent_model::{ToolCallRequest, ToolResultKind};
use tracing::Instrument;

use super::{Error, ToolCatalog, ToolRegistry, ToolResult};

const EMPTY_RESULT: &str = "No response from tool";

/// Merges the content blocks returned by one tool call into one result.
///
/// Texts are joined by line breaks. A single error block makes the whole
/// result an error, and an empty list becomes a placeholder text.
pub fn aggregate_results(blocks: Vec<ToolResult>) -> ToolResult {
    if blocks.is_empty() {
        return ToolResult::text(EMPTY_RESULT);
    }
    let kind = if blocks.iter().any(ToolResult::is_error) {
        ToolResultKind::Error
    } else {
        ToolResultKind::Text
    };
    let text = blocks
        .into_iter()
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");
    ToolResult { kind, text }
}

/// An executor that handles tool call requests from the model.
pub struct Executor {
    registry: Arc<dyn ToolRegistry>,
    catalog: ToolCatalog,
    timeout: Option<Duration>,
}

impl Executor {
    #[inline]
    pub fn new(
        registry: Arc<dyn ToolRegistry>,
        catalog: ToolCatalog,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            catalog,
            timeout,
        }
    }

    #[inline]
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Executes one request. Failures are turned into error results.
    pub async fn execute(&self, req: &ToolCallRequest) -> ToolResult {
        let span = debug_span!("tool executor", tool = %req.name, id = %req.id);
        let outcome = self.call(req).instrument(span).await;
        match outcome {
            Ok(blocks) => aggregate_results(blocks),
            Err(err) => {
                warn!("tool call {} ({}) failed: {err}", req.name, req.id);
                ToolResult::error(err.reason())
            }
        }
    }

    async fn call(&self, req: &ToolCallRequest) -> Result<Vec<ToolResult>, Error> {
        if !self.catalog.contains(&req.name) {
            warn!("tool not found: {}", req.name);
            return Err(Error::not_found()
                .with_reason(format!("Tool not found: {}", req.name)));
        }

        if let Some(problem) = &req.invalid_arguments {
            return Err(Error::invalid_input()
                .with_reason(format!("Invalid arguments for {}: {problem}", req.name)));
        }

        trace!("calling a tool with args: {:?}", req.arguments);
        let fut = self.registry.call_tool(&req.name, req.arguments.clone());
        let Some(timeout) = self.timeout else {
            return fut.await;
        };
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout().with_reason(format!(
                "Tool {} timed out after {} seconds",
                req.name,
                timeout.as_secs_f32()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};

    use super::*;
    use crate::tool::ToolDefinition;

    #[derive(Default)]
    struct ScriptedRegistry {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolRegistry for ScriptedRegistry {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, Error> {
            Ok(["split", "broken", "silent", "slow"]
                .into_iter()
                .map(|name| ToolDefinition {
                    name: name.to_owned(),
                    description: String::new(),
                    input_schema: json!({"type": "object"}),
                })
                .collect())
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: Map<String, Value>,
        ) -> Result<Vec<ToolResult>, Error> {
            self.calls.lock().unwrap().push(name.to_owned());
            match name {
                "split" => Ok(vec![
                    ToolResult::text("first"),
                    ToolResult::text("second"),
                ]),
                "broken" => Err(Error::execution_error()
                    .with_reason("tracker returned 500")),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(vec![ToolResult::text("too late")])
                }
                _ => Ok(vec![]),
            }
        }
    }

    async fn executor(
        registry: Arc<ScriptedRegistry>,
        timeout: Option<Duration>,
    ) -> Executor {
        let catalog = ToolCatalog::new(registry.list_tools().await.unwrap());
        Executor::new(registry, catalog, timeout)
    }

    fn request(name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: format!("call_{name}"),
            name: name.to_owned(),
            arguments: Map::new(),
            invalid_arguments: None,
        }
    }

    #[test]
    fn test_aggregate_results() {
        assert_eq!(aggregate_results(vec![]), ToolResult::text(EMPTY_RESULT));
        assert_eq!(
            aggregate_results(vec![
                ToolResult::text("story"),
                ToolResult::error("comment rejected"),
            ]),
            ToolResult::error("story\ncomment rejected")
        );
    }

    #[tokio::test]
    async fn test_execute() {
        let registry = Arc::new(ScriptedRegistry::default());
        let executor = executor(Arc::clone(&registry), None).await;

        let result = executor.execute(&request("split")).await;
        assert_eq!(result, ToolResult::text("first\nsecond"));

        let result = executor.execute(&request("broken")).await;
        assert_eq!(result, ToolResult::error("tracker returned 500"));

        let result = executor.execute(&request("silent")).await;
        assert_eq!(result, ToolResult::text(EMPTY_RESULT));
    }

    #[tokio::test]
    async fn test_unknown_tool_skips_registry() {
        let registry = Arc::new(ScriptedRegistry::default());
        let executor = executor(Arc::clone(&registry), None).await;

        let result = executor.execute(&request("deploy")).await;
        assert!(result.is_error());
        assert_eq!(result.text, "Tool not found: deploy");
        assert!(registry.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_registry() {
        let registry = Arc::new(ScriptedRegistry::default());
        let executor = executor(Arc::clone(&registry), None).await;

        let mut req = request("split");
        req.invalid_arguments = Some("arguments are not a JSON object: [1]".to_owned());
        let result = executor.execute(&req).await;
        assert!(result.is_error());
        assert_eq!(
            result.text,
            "Invalid arguments for split: arguments are not a JSON object: [1]"
        );
        assert!(registry.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let registry = Arc::new(ScriptedRegistry::default());
        let executor =
            executor(Arc::clone(&registry), Some(Duration::from_secs(2))).await;

        let result = executor.execute(&request("slow")).await;
        assert!(result.is_error());
        assert_eq!(result.text, "Tool slow timed out after 2 seconds");
    }
}
