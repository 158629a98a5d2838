use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provider::ModelProviderError;

/// A response of a chat request, consumed as a sequence of events.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls the next event of the response.
    ///
    /// Events arrive in the order the model produced them: text deltas,
    /// then tool calls, then one [`ModelResponseEvent::Completed`].
    /// `Ok(None)` marks the end of the response and is returned again on
    /// every later call. `Pending` registers the waker of `cx` like any
    /// other poll function.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped producing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model wants the requested tools to run before it continues.
    ToolCalls,
    /// The model finished its answer.
    Stop,
    /// The output hit the token limit and is truncated.
    Length,
}

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlates the request with its result message.
    pub id: String,
    /// Name of a tool from the offered catalog.
    pub name: String,
    /// The arguments to pass to the tool, keyed by parameter name.
    pub arguments: Map<String, Value>,
    /// Set when the model sent arguments that couldn't be parsed. Such a
    /// call is answered with an error naming the problem and never runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_arguments: Option<String>,
}

/// One step of a model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The last event, carrying the finish reason.
    Completed(ModelFinishReason),
    /// A piece of the assistant text.
    MessageDelta(String),
    /// A tool the model wants to call.
    ToolCall(ToolCallRequest),
}
