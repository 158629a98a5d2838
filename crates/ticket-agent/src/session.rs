use std::sync::Arc;
use std::time::Duration;

use ticket_agent_core::tool::{Error as ToolError, ToolRegistry};
use ticket_agent_core::{Agent, AgentBuilder, TranscriptSource};
use ticket_agent_model::ModelProvider;
use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::mcp::{McpError, McpServerConfig, McpToolRegistry};

/// Errors of a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The MCP server can't be started or reached.
    #[error(transparent)]
    Mcp(#[from] McpError),
    /// The tools can't be listed.
    #[error("failed to list tools: {0}")]
    Tools(#[from] ToolError),
    /// The session was closed before the turn finished.
    #[error("the session is closed")]
    Closed,
}

enum ToolSource {
    None,
    Mcp(McpServerConfig),
    Registry(Arc<dyn ToolRegistry>),
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    tools: ToolSource,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            tools: ToolSource::None,
        }
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Takes the tools from an MCP server started by [`build`](Self::build).
    #[inline]
    pub fn with_mcp_server(mut self, config: McpServerConfig) -> Self {
        self.tools = ToolSource::Mcp(config);
        self
    }

    /// Takes the tools from an existing registry.
    #[inline]
    pub fn with_tool_registry(mut self, registry: Arc<dyn ToolRegistry>) -> Self {
        self.tools = ToolSource::Registry(registry);
        self
    }

    /// Sets how long a tool call may take.
    #[inline]
    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.agent_builder = self.agent_builder.with_tool_timeout(timeout);
        self
    }

    /// Sets the maximum number of tool rounds in one turn.
    #[inline]
    pub fn with_max_tool_rounds(mut self, max_rounds: Option<usize>) -> Self {
        self.agent_builder = self.agent_builder.with_max_tool_rounds(max_rounds);
        self
    }

    /// Sets the maximum number of messages sent to the model per request.
    #[inline]
    pub fn with_max_transcript_messages(mut self, max: Option<usize>) -> Self {
        self.agent_builder =
            self.agent_builder.with_max_transcript_messages(max);
        self
    }

    /// Enables answering with plain generation when chat fails.
    #[inline]
    pub fn with_generate_fallback(mut self, enabled: bool) -> Self {
        self.agent_builder = self.agent_builder.with_generate_fallback(enabled);
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Connects the tools and starts the session.
    ///
    /// Fails if the MCP server can't be started or its tools can't be
    /// listed.
    pub async fn build(self) -> Result<Session, SessionError> {
        let (agent_builder, mcp) = match self.tools {
            ToolSource::None => (self.agent_builder, None),
            ToolSource::Registry(registry) => {
                (self.agent_builder.with_tool_registry(registry), None)
            }
            ToolSource::Mcp(config) => {
                let mcp = Arc::new(McpToolRegistry::connect(&config).await?);
                let builder = self.agent_builder.with_tool_registry(mcp.clone());
                (builder, Some(mcp))
            }
        };

        let agent = match agent_builder.build().await {
            Ok(agent) => agent,
            Err(err) => {
                if let Some(mcp) = &mcp {
                    mcp.close().await.ok();
                }
                return Err(err.into());
            }
        };
        info!("session started with {} tools", agent.catalog().len());

        let (turn_tx, turn_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = watch::channel(false);
        let worker = tokio::spawn(
            run_worker(agent, turn_rx, kill_rx).instrument(debug_span!("session")),
        );

        Ok(Session {
            turn_tx,
            kill_tx,
            worker,
            mcp,
        })
    }
}

struct Turn {
    input: String,
    reply_tx: oneshot::Sender<String>,
}

/// A chat session.
///
/// The session owns an agent running on a background task. Messages are
/// processed one at a time in the order they were sent.
pub struct Session {
    turn_tx: mpsc::UnboundedSender<Turn>,
    kill_tx: watch::Sender<bool>,
    worker: JoinHandle<()>,
    mcp: Option<Arc<McpToolRegistry>>,
}

impl Session {
    /// Sends a message and waits for the answer of its turn.
    pub async fn send_message(&self, message: &str) -> Result<String, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.turn_tx
            .send(Turn {
                input: message.to_owned(),
                reply_tx,
            })
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Stops the agent and shuts the tool server down.
    ///
    /// A turn that is still running is abandoned.
    pub async fn close(self) -> Result<(), SessionError> {
        self.kill_tx.send(true).ok();
        drop(self.turn_tx);
        if let Err(err) = self.worker.await {
            warn!("session worker failed: {err}");
        }
        if let Some(mcp) = self.mcp {
            mcp.close().await?;
        }
        Ok(())
    }
}

async fn run_worker(
    mut agent: Agent,
    mut turn_rx: mpsc::UnboundedReceiver<Turn>,
    mut kill_rx: watch::Receiver<bool>,
) {
    debug!("started");
    loop {
        let turn = select! {
            biased;

            _ = kill_rx.changed() => {
                break;
            }
            turn = turn_rx.recv() => {
                let Some(turn) = turn else {
                    break;
                };
                turn
            }
        };

        let answer = select! {
            biased;

            _ = kill_rx.changed() => {
                debug!("abandoning the running turn");
                break;
            }
            answer = agent.run_turn(&turn.input) => answer,
        };
        if turn.reply_tx.send(answer).is_err() {
            trace!("the sender is gone, discard the answer");
        }
    }
    debug!("will terminate");
}
