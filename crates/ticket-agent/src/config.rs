//! Command line and environment configuration of the binaries.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};
use ticket_agent_ollama_model::{OllamaConfig, OllamaConfigBuilder};

use crate::mcp::McpServerConfig;
use crate::tracker::TrackerConfig;

/// File name of the MCP ticket server binary.
pub const SERVER_BIN_NAME: &str = "ticket-agent-server";

/// Options of the interactive agent.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "Chat with a local model that works on tracker tickets")]
pub struct AgentArgs {
    #[command(flatten)]
    pub(crate) ollama: OllamaArgs,

    /// Maximum number of tool rounds in one turn, 0 disables the cap.
    #[arg(long, env = "AGENT_MAX_TOOL_ROUNDS", default_value_t = 16)]
    pub max_tool_rounds: usize,

    /// Maximum number of messages sent to the model per request.
    #[arg(long, env = "AGENT_MAX_TRANSCRIPT_MESSAGES")]
    pub max_transcript_messages: Option<usize>,

    /// Seconds a tool call may take, 0 disables the timeout.
    #[arg(long, env = "AGENT_TOOL_TIMEOUT_SECS", default_value_t = 120)]
    pub tool_timeout_secs: u64,

    /// Answer with plain generation when the chat endpoint fails.
    #[arg(long, env = "AGENT_GENERATE_FALLBACK")]
    pub generate_fallback: bool,

    /// MCP server executable, defaults to the ticket server next to this
    /// binary.
    #[arg(long, env = "MCP_SERVER_COMMAND")]
    pub mcp_command: Option<PathBuf>,

    /// Argument passed to the MCP server, may be repeated.
    #[arg(long = "mcp-arg", allow_hyphen_values = true)]
    pub mcp_args: Vec<String>,
}

#[derive(Clone, Args)]
pub(crate) struct OllamaArgs {
    /// Root URL of the Ollama server.
    #[arg(long = "ollama-url", env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub url: String,

    /// Model to chat with.
    #[arg(long = "ollama-model", env = "OLLAMA_MODEL", default_value = "my_qwen")]
    pub model: String,

    /// Bearer token for Ollama servers behind a proxy.
    #[arg(long = "ollama-api-key", env = "OLLAMA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Sampling temperature.
    #[arg(long, env = "OLLAMA_TEMPERATURE", default_value_t = 0.3)]
    pub temperature: f32,

    /// Seconds to wait for a chat response.
    #[arg(long = "chat-timeout-secs", env = "OLLAMA_TIMEOUT_SECS", default_value_t = 600)]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OllamaArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaArgs")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AgentArgs {
    /// Returns the configuration of the model provider.
    pub fn ollama_config(&self) -> OllamaConfig {
        let mut builder = OllamaConfigBuilder::with_model(&self.ollama.model)
            .with_base_url(&self.ollama.url)
            .with_temperature(self.ollama.temperature)
            .with_think(false)
            .with_timeout(Duration::from_secs(self.ollama.timeout_secs));
        if let Some(api_key) = &self.ollama.api_key {
            builder = builder.with_api_key(api_key);
        }
        builder.build()
    }

    /// Returns the tool round cap, `None` if uncapped.
    pub fn max_tool_rounds(&self) -> Option<usize> {
        Some(self.max_tool_rounds).filter(|&rounds| rounds > 0)
    }

    /// Returns the tool timeout, `None` if disabled.
    pub fn tool_timeout(&self) -> Option<Duration> {
        Some(self.tool_timeout_secs)
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Returns how to start the MCP server.
    pub fn mcp_server(&self) -> io::Result<McpServerConfig> {
        let command = match &self.mcp_command {
            Some(command) => command.clone(),
            None => default_server_path()?,
        };
        let mut config = McpServerConfig::new(command.to_string_lossy());
        for arg in &self.mcp_args {
            config = config.with_arg(arg);
        }
        Ok(config)
    }
}

fn default_server_path() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe.with_file_name(format!(
        "{SERVER_BIN_NAME}{}",
        std::env::consts::EXE_SUFFIX
    )))
}

/// Options of the MCP ticket server, read from the environment.
#[derive(Clone, Parser)]
#[command(author, version, about = "MCP server exposing tracker tools over stdio")]
pub struct ServerArgs {
    /// Root of the tracker REST API.
    #[arg(long, env = "TP_BASE_URL", default_value = "https://elateral.tpondemand.com/api/")]
    pub base_url: String,

    /// API version segment.
    #[arg(long, env = "TP_API_VERSION", default_value = "v1")]
    pub api_version: String,

    /// Access token forwarded to the tracker.
    #[arg(long, env = "TP_TOKEN", hide_env_values = true)]
    pub token: String,

    /// User that owns posted comments.
    #[arg(long, env = "TP_OWNER_ID")]
    pub owner_id: Option<u64>,

    /// Project new bugs are created in.
    #[arg(long, env = "TP_PROJECT_ID")]
    pub project_id: Option<u64>,
}

impl ServerArgs {
    /// Returns the tracker configuration.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::with_token(&self.token)
            .with_base_url(&self.base_url)
            .with_api_version(&self.api_version)
            .with_owner_id(self.owner_id)
            .with_project_id(self.project_id)
    }
}

impl std::fmt::Debug for ServerArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerArgs")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("token", &"<deducted>")
            .field("owner_id", &self.owner_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}
