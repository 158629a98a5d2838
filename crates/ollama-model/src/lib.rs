//! A model provider for the Ollama chat API.
//!
//! Requests are sent without streaming. Connection failures are retried
//! with exponential backoff for a bounded window, everything else is
//! reported to the caller as is.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use ticket_agent_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use tracing::Instrument;

pub use config::{OllamaConfig, OllamaConfigBuilder};
use proto::{ChatResponse, ErrorResponse, GenerateResponse};
pub use response::OllamaResponse;

/// Error type for [`OllamaProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Other
        };
        Self::new(format!("{err}"), kind)
    }
}

/// Ollama model provider.
#[derive(Clone, Debug)]
pub struct OllamaProvider {
    client: Client,
    config: Arc<OllamaConfig>,
}

impl OllamaProvider {
    /// Creates a new `OllamaProvider` with the given configuration.
    pub fn new(config: OllamaConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

impl ModelProvider for OllamaProvider {
    type Error = Error;
    type Response = OllamaResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let chat_req = proto::create_chat_request(req, &self.config);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let span = debug_span!(
            "ollama chat",
            model = %config.model,
            messages = req.messages.len(),
            tools = req.tools.len(),
        );

        async move {
            let resp = post_json(&client, &config, "/api/chat", &chat_req).await?;
            let chat: ChatResponse = decode_json(resp).await?;
            debug!(
                model = %chat.model,
                done_reason = ?chat.done_reason,
                prompt_eval_count = ?chat.prompt_eval_count,
                eval_count = ?chat.eval_count,
                total_duration = ?chat.total_duration.map(Duration::from_nanos),
                "chat completed"
            );
            OllamaResponse::from_chat_response(chat)
        }
        .instrument(span)
    }

    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'static
    {
        let gen_req = proto::create_generate_request(prompt, &self.config);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let span = debug_span!("ollama generate", model = %config.model);

        async move {
            let resp =
                post_json(&client, &config, "/api/generate", &gen_req).await?;
            let generated: GenerateResponse = decode_json(resp).await?;
            debug!(
                model = %generated.model,
                eval_count = ?generated.eval_count,
                total_duration =
                    ?generated.total_duration.map(Duration::from_nanos),
                "generate completed"
            );
            Ok(generated.response)
        }
        .instrument(span)
    }
}

async fn post_json<T: Serialize>(
    client: &Client,
    config: &OllamaConfig,
    path: &str,
    body: &T,
) -> Result<Response, Error> {
    let url = format!("{}{}", config.base_url, path);
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(250))
        .with_max_elapsed_time(Some(config.retry_window))
        .build();

    let resp = backoff::future::retry(policy, || {
        let mut builder = client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body);
        if let Some(api_key) = &config.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let resp_fut = builder.send();
        async move {
            resp_fut.await.map_err(|err| {
                // Only failures before the request reached the server are
                // safe to repeat.
                if err.is_connect() {
                    warn!("failed to connect to ollama, retrying: {err}");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    })
    .await?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.error)
        .unwrap_or(body);
    Err(Error::new(
        format!("ollama returned {status}: {message}"),
        error_kind_for_status(status),
    ))
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let is_valid_content_type = content_type
        .and_then(|v| v.parse().ok())
        .map(|m: Mime| m.subtype() == mime::JSON)
        .unwrap_or(false);
    if !is_valid_content_type {
        return Err(Error::new(
            format!("unexpected content type: {content_type:?}"),
            ErrorKind::Other,
        ));
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| {
        Error::new(format!("malformed response: {err}"), ErrorKind::Other)
    })
}

fn error_kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ErrorKind::Timeout
        }
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;
    use ticket_agent_model::{
        ModelFinishReason, ModelMessage, ModelResponse, ModelResponseEvent,
    };
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider(server: &MockServer) -> OllamaProvider {
        let config = OllamaConfigBuilder::with_model("my_qwen")
            .with_base_url(server.uri())
            .with_retry_window(Duration::ZERO)
            .build();
        OllamaProvider::new(config).unwrap()
    }

    fn user_request(text: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User(text.to_owned())],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_chat_with_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"model": "my_qwen", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "my_qwen",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {"name": "get_bug", "arguments": {"id": "77"}}
                    }]
                },
                "done": true,
                "done_reason": "stop",
                "eval_count": 12
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = provider(&server)
            .send_request(&user_request("check bug 77"))
            .await
            .unwrap();
        let mut resp = pin!(resp);
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ModelResponseEvent::ToolCall(req) if req.name == "get_bug"
        ));
        assert_eq!(
            events[1],
            ModelResponseEvent::Completed(ModelFinishReason::ToolCalls)
        );
    }

    #[tokio::test]
    async fn test_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"prompt": "User: hi\n\nAssistant:"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "my_qwen",
                "response": "Hello!",
                "done": true
            })))
            .mount(&server)
            .await;

        let text = provider(&server)
            .generate("User: hi\n\nAssistant:")
            .await
            .unwrap();
        assert_eq!(text, "Hello!");
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(header("authorization", "Bearer sk-local"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "my_qwen",
                "response": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = OllamaConfigBuilder::with_model("my_qwen")
            .with_base_url(server.uri())
            .with_api_key("sk-local")
            .build();
        let provider = OllamaProvider::new(config).unwrap();
        assert_eq!(provider.generate("ping").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"error": "server busy"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"error": "model 'my_qwen' not found"})),
            )
            .mount(&server)
            .await;

        let provider = provider(&server);
        let err = provider
            .send_request(&user_request("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(err.message().contains("server busy"));

        let err = provider.generate("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.message().contains("not found"));
    }

    #[tokio::test]
    async fn test_unexpected_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;

        let err = provider(&server).generate("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"model": "my_qwen", "response": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = OllamaConfigBuilder::with_model("my_qwen")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(100))
            .build();
        let provider = OllamaProvider::new(config).unwrap();
        let err = provider.generate("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
