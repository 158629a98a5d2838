mod builder;

use std::sync::Arc;

use ticket_agent_model::{
    AssistantMessage, ModelMessage, ModelProviderError, ModelRequest, Role,
    ToolCallResult,
};
use tracing::Instrument;

use crate::conversation::{Conversation, TranscriptSource};
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::tool::{Executor as ToolExecutor, ToolCatalog};
pub use builder::AgentBuilder;

/// The system prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with \
    access to tools. When the user asks about available tools or wants to \
    list tools, provide a clear list of available tools with their \
    descriptions.";

/// The instruction appended before the summarizing request of a turn.
pub const SUMMARY_PROMPT: &str =
    "If the task is complete, answer Done; otherwise state what remains.";

/// Returned when the model doesn't answer.
pub const NO_RESPONSE: &str = "No response from the model.";

/// Returned when a turn hits the configured tool round limit.
pub const MAX_STEPS_EXCEEDED_RESPONSE: &str =
    "Max steps exceeded, the task was stopped before it could finish.";

pub(crate) type TranscriptFn = Arc<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// An agent instance, which maintains a conversation, a model client and
/// the tools offered to the model.
///
/// A turn runs the model until it stops requesting tools. Tool calls are
/// executed one by one in the order the model emitted them, and their
/// results are handed back to the model in the next request. Turns take
/// `&mut self`, so one agent never runs two turns at the same time.
pub struct Agent {
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    conversation: Conversation,
    max_tool_rounds: Option<usize>,
    max_transcript_messages: Option<usize>,
    generate_fallback: bool,
    on_transcript: Option<TranscriptFn>,
}

impl Agent {
    /// Runs one conversation turn and returns the final answer.
    ///
    /// An empty `input` continues the conversation without adding a user
    /// message. Failures never escape a turn, they are reported as text.
    pub async fn run_turn(&mut self, input: &str) -> String {
        let span = debug_span!("agent turn", turn_start = self.conversation.len());
        self.run_turn_inner(input).instrument(span).await
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the tools offered to the model.
    #[inline]
    pub fn catalog(&self) -> &ToolCatalog {
        self.tool_executor.catalog()
    }

    async fn run_turn_inner(&mut self, input: &str) -> String {
        if !input.is_empty() {
            self.append(ModelMessage::User(input.to_owned()));
        }

        let mut rounds = 0;
        loop {
            let resp = match self.request_completion(true).await {
                Ok(resp) => resp,
                Err(err) => {
                    warn!("model request failed: {err}");
                    if rounds == 0 && self.generate_fallback && !input.is_empty()
                    {
                        if let Some(answer) = self.direct_answer(input).await {
                            return answer;
                        }
                    }
                    return NO_RESPONSE.to_owned();
                }
            };

            let msg = resp.into_message();
            let content = msg.content.clone();
            let tool_calls = msg.tool_calls.clone();
            self.append(ModelMessage::Assistant(msg));

            if tool_calls.is_empty() {
                return self.summarize(content).await;
            }

            if self.round_limit_reached(rounds) {
                warn!("dropping {} tool calls past the round limit", tool_calls.len());
                return MAX_STEPS_EXCEEDED_RESPONSE.to_owned();
            }

            debug!("running {} tool calls", tool_calls.len());
            for req in &tool_calls {
                let result = self.tool_executor.execute(req).await;
                self.append(ModelMessage::Tool(ToolCallResult {
                    id: req.id.clone(),
                    name: req.name.clone(),
                    kind: result.kind,
                    content: result.text,
                }));
            }

            rounds += 1;
            if self.round_limit_reached(rounds) {
                warn!("stopping the turn after {rounds} tool rounds");
                return MAX_STEPS_EXCEEDED_RESPONSE.to_owned();
            }
        }
    }

    #[inline]
    fn round_limit_reached(&self, rounds: usize) -> bool {
        self.max_tool_rounds.is_some_and(|max| rounds >= max)
    }

    async fn summarize(&mut self, provisional: String) -> String {
        self.append(ModelMessage::System(SUMMARY_PROMPT.to_owned()));
        let resp = match self.request_completion(false).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!("summarizing request failed: {err}");
                return provisional;
            }
        };

        let mut msg = resp.into_message();
        if !msg.tool_calls.is_empty() {
            warn!("dropping {} tool calls from the summary", msg.tool_calls.len());
            msg.tool_calls.clear();
        }
        let content = msg.content.clone();
        self.append(ModelMessage::Assistant(msg));
        if content.is_empty() {
            provisional
        } else {
            content
        }
    }

    async fn direct_answer(&mut self, input: &str) -> Option<String> {
        let prompt = format!("User: {input}\n\nAssistant:");
        match self.model_client.generate(prompt).await {
            Ok(answer) if !answer.is_empty() => {
                self.append(ModelMessage::Assistant(AssistantMessage {
                    content: answer.clone(),
                    tool_calls: vec![],
                }));
                Some(answer)
            }
            Ok(_) => None,
            Err(err) => {
                warn!("direct answer failed: {err}");
                None
            }
        }
    }

    async fn request_completion(
        &self,
        with_tools: bool,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        let tools = if with_tools {
            self.catalog().declarations().to_vec()
        } else {
            vec![]
        };
        let req = ModelRequest {
            messages: self.conversation.window(self.max_transcript_messages),
            tools,
        };
        self.model_client.send_request(req).await
    }

    fn append(&mut self, msg: ModelMessage) {
        if let Some(on_transcript) = &self.on_transcript {
            let source = match msg.role() {
                Role::User => Some(TranscriptSource::User),
                Role::Assistant => Some(TranscriptSource::Assistant),
                Role::Tool => Some(TranscriptSource::Tool),
                Role::System => None,
            };
            match source {
                Some(source) if !msg.content().is_empty() => {
                    on_transcript(msg.content(), source);
                }
                _ => {}
            }
        }
        self.conversation.append(msg);
    }
}
