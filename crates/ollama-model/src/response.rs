use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use ticket_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use uuid::Uuid;

use crate::Error;
use crate::proto::{self, ChatResponse};

/// A completed chat response, replayed as model events.
///
/// Ollama answers non-streaming requests with a single JSON document, so
/// every event is already available when this value is created.
#[derive(Debug)]
pub struct OllamaResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl OllamaResponse {
    pub(crate) fn from_chat_response(resp: ChatResponse) -> Result<Self, Error> {
        let Some(message) = resp.message else {
            return Err(Error::new(
                "response has no message",
                ErrorKind::Other,
            ));
        };
        if let Some(thinking) = &message.thinking {
            trace!("model thinking: {thinking}");
        }

        let mut events = VecDeque::new();
        if !message.content.is_empty() {
            events.push_back(ModelResponseEvent::MessageDelta(message.content));
        }

        // The order of events is important. Message delta goes first, then
        // tool calls in the order the model emitted them.
        let has_tool_calls = !message.tool_calls.is_empty();
        for call in message.tool_calls {
            let req = proto::create_tool_call_request(call, || {
                format!("call_{}", Uuid::new_v4().simple())
            });
            events.push_back(ModelResponseEvent::ToolCall(req));
        }

        let finish_reason = if has_tool_calls {
            ModelFinishReason::ToolCalls
        } else if resp.done_reason.as_deref() == Some("length") {
            ModelFinishReason::Length
        } else {
            ModelFinishReason::Stop
        };
        events.push_back(ModelResponseEvent::Completed(finish_reason));
        Ok(Self { events })
    }
}

impl ModelResponse for OllamaResponse {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;

    use super::*;

    async fn collect(resp: OllamaResponse) -> Vec<ModelResponseEvent> {
        let mut resp = pin!(resp);
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let chat: ChatResponse = serde_json::from_value(json!({
            "model": "my_qwen",
            "created_at": "2025-01-01T00:00:00Z",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "get_user_story", "arguments": {"id": "1"}}},
                    {"id": "call_b", "function": {"name": "get_bug", "arguments": {"id": "2"}}}
                ]
            },
            "done": true,
            "done_reason": "stop"
        }))
        .unwrap();

        let events = collect(OllamaResponse::from_chat_response(chat).unwrap())
            .await;
        assert_eq!(events.len(), 3);
        let ModelResponseEvent::ToolCall(first) = &events[0] else {
            panic!("expected a tool call, got {:?}", events[0]);
        };
        assert_eq!(first.name, "get_user_story");
        assert!(first.id.starts_with("call_"));
        let ModelResponseEvent::ToolCall(second) = &events[1] else {
            panic!("expected a tool call, got {:?}", events[1]);
        };
        assert_eq!(second.id, "call_b");
        assert_eq!(
            events[2],
            ModelResponseEvent::Completed(ModelFinishReason::ToolCalls)
        );
    }

    #[tokio::test]
    async fn test_plain_text() {
        let chat: ChatResponse = serde_json::from_value(json!({
            "model": "my_qwen",
            "message": {"role": "assistant", "content": "Hello there"},
            "done": true
        }))
        .unwrap();
        let events = collect(OllamaResponse::from_chat_response(chat).unwrap())
            .await;
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Hello there".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_truncated_text() {
        let chat: ChatResponse = serde_json::from_value(json!({
            "model": "my_qwen",
            "message": {"role": "assistant", "content": "1. Open the"},
            "done": true,
            "done_reason": "length"
        }))
        .unwrap();
        let events = collect(OllamaResponse::from_chat_response(chat).unwrap())
            .await;
        assert_eq!(
            events.last(),
            Some(&ModelResponseEvent::Completed(ModelFinishReason::Length))
        );
    }

    #[test]
    fn test_missing_message() {
        let chat: ChatResponse =
            serde_json::from_value(json!({"model": "my_qwen", "done": true}))
                .unwrap();
        let err = OllamaResponse::from_chat_response(chat).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
    }
}
