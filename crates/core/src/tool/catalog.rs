use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use ticket_agent_model::ModelTool;

use super::ToolDefinition;

/// An immutable snapshot of the tools available to the agent.
///
/// The catalog is cheap to clone. Tool declarations for the model are
/// computed on first use and shared afterwards.
#[derive(Clone, Debug)]
pub struct ToolCatalog {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    tools: Vec<ToolDefinition>,
    declarations: OnceLock<Vec<ModelTool>>,
}

impl ToolCatalog {
    /// Creates a catalog from the listed tools.
    ///
    /// When several tools share a name, only the first one is kept.
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        let mut seen = HashSet::with_capacity(tools.len());
        let tools = tools
            .into_iter()
            .filter(|tool| {
                let fresh = seen.insert(tool.name.clone());
                if !fresh {
                    warn!("ignoring duplicated tool: {}", tool.name);
                }
                fresh
            })
            .collect();
        Self {
            inner: Arc::new(Inner {
                tools,
                declarations: OnceLock::new(),
            }),
        }
    }

    /// Returns all tools in listing order.
    #[inline]
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.inner.tools
    }

    /// Looks up a tool by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.inner.tools.iter().find(|tool| tool.name == name)
    }

    /// Returns `true` if a tool with the given name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.tools.len()
    }

    /// Returns `true` if the catalog has no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.tools.is_empty()
    }

    /// Returns the tools as declarations understood by model providers.
    pub fn declarations(&self) -> &[ModelTool] {
        self.inner.declarations.get_or_init(|| {
            self.inner
                .tools
                .iter()
                .map(|tool| ModelTool {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                })
                .collect()
        })
    }
}
