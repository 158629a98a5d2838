use std::sync::Arc;
use std::time::Duration;

use ticket_agent_model::ModelProvider;

use super::{Agent, DEFAULT_SYSTEM_PROMPT, TranscriptFn};
use crate::conversation::{Conversation, TranscriptSource};
use crate::model_client::ModelClient;
use crate::tool::{
    Error as ToolError, Executor as ToolExecutor, LocalRegistry, ToolCatalog,
    ToolRegistry,
};

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    system_prompt: String,
    tool_registry: Option<Arc<dyn ToolRegistry>>,
    tool_timeout: Option<Duration>,
    max_tool_rounds: Option<usize>,
    max_transcript_messages: Option<usize>,
    generate_fallback: bool,
    on_transcript: Option<TranscriptFn>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            tool_registry: None,
            tool_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            max_tool_rounds: None,
            max_transcript_messages: None,
            generate_fallback: false,
            on_transcript: None,
        }
    }

    /// Sets the system prompt that seeds the conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the registry that provides and executes tools.
    ///
    /// Without a registry the model is offered no tools.
    #[inline]
    pub fn with_tool_registry(mut self, registry: Arc<dyn ToolRegistry>) -> Self {
        self.tool_registry = Some(registry);
        self
    }

    /// Sets the time limit of a single tool call, `None` waits forever.
    #[inline]
    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Limits how many rounds of tool calls a single turn may run.
    ///
    /// `Some(0)` allows none: a reply that requests tools ends the turn
    /// with [`MAX_STEPS_EXCEEDED_RESPONSE`] and nothing is executed.
    ///
    /// [`MAX_STEPS_EXCEEDED_RESPONSE`]: crate::MAX_STEPS_EXCEEDED_RESPONSE
    #[inline]
    pub fn with_max_tool_rounds(mut self, max_rounds: Option<usize>) -> Self {
        self.max_tool_rounds = max_rounds;
        self
    }

    /// Limits how many messages are sent to the model per request.
    ///
    /// The seeded system prompt and the newest user message are always
    /// sent, older messages are left out first. The conversation itself
    /// keeps every message.
    #[inline]
    pub fn with_max_transcript_messages(
        mut self,
        max_messages: Option<usize>,
    ) -> Self {
        self.max_transcript_messages = max_messages;
        self
    }

    /// Answers with a plain completion when the first chat request of a
    /// turn fails.
    #[inline]
    pub fn with_generate_fallback(mut self, enabled: bool) -> Self {
        self.generate_fallback = enabled;
        self
    }

    /// Attaches a callback invoked with every non-empty user, assistant and
    /// tool message added to the conversation.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Builds the agent, fetching the tool catalog from the registry.
    pub async fn build(self) -> Result<Agent, ToolError> {
        let registry = self
            .tool_registry
            .unwrap_or_else(|| Arc::new(LocalRegistry::new()));
        let catalog = ToolCatalog::new(registry.list_tools().await?);
        debug!("agent is ready with {} tools", catalog.len());

        Ok(Agent {
            model_client: self.model_client,
            tool_executor: ToolExecutor::new(
                registry,
                catalog,
                self.tool_timeout,
            ),
            conversation: Conversation::with_system_prompt(self.system_prompt),
            max_tool_rounds: self.max_tool_rounds,
            max_transcript_messages: self.max_transcript_messages,
            generate_fallback: self.generate_fallback,
            on_transcript: self.on_transcript,
        })
    }
}
