use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::object::{ToolObject, ToolObjectImpl};
use super::{Error, Tool, ToolDefinition, ToolOutput, ToolRegistry, ToolResult};

/// A registry of in-process tools.
///
/// Tools are listed in the order they were added. Adding a tool whose name
/// is already taken replaces the previous one in place.
#[derive(Default)]
pub struct LocalRegistry {
    tools: Vec<Box<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl LocalRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, returning the registry for chaining.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.add_tool(tool);
        self
    }

    /// Adds a tool.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let tool: Box<dyn ToolObject> = Box::new(ToolObjectImpl(tool));
        let name = tool.name().to_owned();
        match self.index.get(&name) {
            Some(&idx) => {
                debug!("replacing tool: {name}");
                self.tools[idx] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Returns the definitions of all tools.
    #[inline]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Returns `true` if a tool with the given name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Starts executing a tool.
    ///
    /// Returns `None` if no tool with the given name exists. Arguments that
    /// don't match the tool input make the returned future resolve to an
    /// [`InvalidInput`](super::ErrorKind::InvalidInput) error.
    pub fn execute(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Option<Pin<Box<dyn Future<Output = ToolOutput> + Send>>> {
        let span = debug_span!("local registry");
        let _enter = span.enter();

        let Some(&idx) = self.index.get(name) else {
            warn!("tool not found: {name}");
            return None;
        };
        trace!("spawning a tool ({name}) with args: {arguments:?}");
        Some(self.tools[idx].execute(arguments))
    }
}

#[async_trait]
impl ToolRegistry for LocalRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, Error> {
        Ok(self.definitions())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ToolResult>, Error> {
        let Some(fut) = self.execute(name, arguments) else {
            return Err(Error::not_found().with_reason(format!(
                "no tool named `{name}`"
            )));
        };
        let text = fut.await?;
        Ok(vec![ToolResult::text(text)])
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::ErrorKind;

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    struct EchoTool {
        name: &'static str,
        schema: Value,
    }

    impl EchoTool {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                schema: json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
            }
        }
    }

    impl Tool for EchoTool {
        type Input = EchoInput;

        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echoes the text back"
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolOutput> + Send + 'static {
            ready(Ok(input.text))
        }
    }

    fn arguments(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_definitions_keep_order() {
        let registry = LocalRegistry::new()
            .with_tool(EchoTool::new("b_tool"))
            .with_tool(EchoTool::new("a_tool"))
            .with_tool(EchoTool::new("b_tool"));
        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|def| def.name)
            .collect();
        assert_eq!(names, ["b_tool", "a_tool"]);
        assert!(registry.contains("a_tool"));
        assert!(!registry.contains("c_tool"));
    }

    #[tokio::test]
    async fn test_call_tool() {
        let registry = LocalRegistry::new().with_tool(EchoTool::new("echo"));

        let blocks = registry
            .call_tool("echo", arguments(json!({"text": "hello"})))
            .await
            .unwrap();
        assert_eq!(blocks, vec![ToolResult::text("hello")]);

        let err = registry
            .call_tool("echo", arguments(json!({"txt": "hello"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = registry
            .call_tool("shout", arguments(json!({"text": "hello"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
