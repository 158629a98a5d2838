use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ticket_agent_model::{
    ModelMessage, ModelRequest, ModelTool, ToolCallRequest, ToolResultKind,
};

use crate::OllamaConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub name: String,
    // Usually an object, but some models put a JSON string here.
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: FunctionCall,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub thinking: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        tool_name: String,
        tool_call_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
    options: Options,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
    options: Options,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_chat_request(
    req: &ModelRequest,
    config: &OllamaConfig,
) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        tools: req.tools.iter().map(create_tool).collect(),
        stream: false,
        think: config.think,
        options: Options {
            temperature: config.temperature,
        },
    }
}

#[inline]
pub fn create_generate_request(
    prompt: &str,
    config: &OllamaConfig,
) -> GenerateRequest {
    GenerateRequest {
        model: config.model.clone(),
        prompt: prompt.to_owned(),
        stream: false,
        think: config.think,
        options: Options {
            temperature: config.temperature,
        },
    }
}

fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(msg) => Message::Assistant {
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .enumerate()
                .map(|(idx, req)| ToolCall {
                    id: Some(req.id.clone()),
                    function: FunctionCall {
                        index: Some(idx as u32),
                        name: req.name.clone(),
                        arguments: Value::Object(req.arguments.clone()),
                    },
                })
                .collect(),
        },
        ModelMessage::Tool(result) => Message::Tool {
            content: match result.kind {
                ToolResultKind::Text => result.content.clone(),
                ToolResultKind::Error => format!("Error: {}", result.content),
            },
            tool_name: result.name.clone(),
            tool_call_id: result.id.clone(),
        },
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Converts a wire tool call into a request, synthesizing an identifier
/// when the server didn't assign one.
pub fn create_tool_call_request(
    call: ToolCall,
    make_id: impl FnOnce() -> String,
) -> ToolCallRequest {
    let id = call.id.filter(|id| !id.is_empty()).unwrap_or_else(make_id);
    let (arguments, invalid_arguments) = match call.function.arguments {
        Value::Object(map) => (map, None),
        Value::String(raw) if raw.trim().is_empty() => (Map::new(), None),
        Value::String(raw) => match serde_json::from_str(&raw) {
            Ok(map) => (map, None),
            Err(err) => {
                warn!("malformed arguments for tool {}: {err}", call.function.name);
                (Map::new(), Some(format!("arguments are not a JSON object: {err}")))
            }
        },
        Value::Null => (Map::new(), None),
        other => (
            Map::new(),
            Some(format!("arguments are not a JSON object: {other}")),
        ),
    };
    ToolCallRequest {
        id,
        name: call.function.name,
        arguments,
        invalid_arguments,
    }
}
