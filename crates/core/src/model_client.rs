use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use ticket_agent_model::{
    AssistantMessage, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, ToolCallRequest,
};
use tracing::Instrument;

type BoxedError = Box<dyn ModelProviderError>;
type SendRequestResult = Result<ModelClientResponse, BoxedError>;
type GenerateResult = Result<String, BoxedError>;
type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type SendRequestFn =
    Arc<dyn Fn(ModelRequest) -> BoxedFuture<SendRequestResult> + Send + Sync>;
type GenerateFn =
    Arc<dyn Fn(String) -> BoxedFuture<GenerateResult> + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    send_request_fn: SendRequestFn,
    generate_fn: GenerateFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let provider = Arc::new(provider);

        let send_request_fn: SendRequestFn = {
            let provider = Arc::clone(&provider);
            Arc::new(move |req: ModelRequest| {
                let fut = provider.send_request(&req);
                Box::pin(
                    async move {
                        trace!("got a request: {:?}", req);
                        handle_response::<P>(fut.await).await
                    }
                    .instrument(trace_span!("model client req")),
                ) as BoxedFuture<SendRequestResult>
            })
        };

        let generate_fn: GenerateFn = Arc::new(move |prompt: String| {
            let fut = provider.generate(&prompt);
            Box::pin(
                async move {
                    fut.await.map_err(|err| {
                        error!("got an error: {err:?}");
                        Box::new(err) as BoxedError
                    })
                }
                .instrument(trace_span!("model client generate")),
            ) as BoxedFuture<GenerateResult>
        });

        Self {
            send_request_fn,
            generate_fn,
        }
    }

    /// Sends a request and collects the whole response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops being polled when
    /// this operation is cancelled.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.send_request_fn)(req).await
    }

    /// Sends a single-shot prompt.
    #[inline]
    pub async fn generate(&self, prompt: String) -> GenerateResult {
        (self.generate_fn)(prompt).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, Default)]
pub struct ModelClientResponse {
    /// Concatenated message deltas.
    pub content: String,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

impl ModelClientResponse {
    #[inline]
    pub fn into_message(self) -> AssistantMessage {
        AssistantMessage {
            content: self.content,
            tool_calls: self.tool_calls,
        }
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut collected = ModelClientResponse::default();

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                collected.content.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                collected.tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                collected.finish_reason = Some(reason);
            }
        }
    }

    if collected.finish_reason == Some(ModelFinishReason::ToolCalls)
        && collected.tool_calls.is_empty()
    {
        warn!("model finished for tool calls but requested none");
    }
    if collected.finish_reason == Some(ModelFinishReason::Length) {
        warn!("model output was truncated at the token limit");
    }
    trace!("finished a request");

    Ok(collected)
}
