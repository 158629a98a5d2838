use std::fmt::Debug;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TEMPERATURE: f32 = 0.3;
// Local models may take minutes to load and answer.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_RETRY_WINDOW: Duration = Duration::from_secs(5);

/// Builder for [`OllamaConfig`].
#[derive(Clone, PartialEq)]
pub struct OllamaConfigBuilder {
    model: String,
    base_url: Option<String>,
    api_key: Option<String>,
    temperature: Option<f32>,
    think: Option<bool>,
    timeout: Option<Duration>,
    retry_window: Option<Duration>,
}

impl OllamaConfigBuilder {
    /// Creates a builder with the given model name.
    #[inline]
    pub fn with_model<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            base_url: None,
            api_key: None,
            temperature: None,
            think: None,
            timeout: None,
            retry_window: None,
        }
    }

    /// Sets a custom base URL, e.g. `http://localhost:11434`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets a bearer token, which is forwarded verbatim to the server.
    ///
    /// Plain Ollama servers don't need it, but authenticating proxies in
    /// front of them usually do.
    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Enables or disables the thinking mode of reasoning models.
    ///
    /// The field is omitted from requests unless set, since some models
    /// reject it.
    #[inline]
    pub fn with_think(mut self, think: bool) -> Self {
        self.think = Some(think);
        self
    }

    /// Sets the ceiling for a single HTTP request.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets for how long failed connection attempts are retried.
    /// `Duration::ZERO` disables retrying.
    #[inline]
    pub fn with_retry_window(mut self, retry_window: Duration) -> Self {
        self.retry_window = Some(retry_window);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OllamaConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        OllamaConfig {
            model: self.model,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: self.api_key,
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            think: self.think,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            retry_window: self.retry_window.unwrap_or(DEFAULT_RETRY_WINDOW),
        }
    }
}

impl Debug for OllamaConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaConfigBuilder")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("temperature", &self.temperature)
            .field("think", &self.think)
            .field("timeout", &self.timeout)
            .field("retry_window", &self.retry_window)
            .finish()
    }
}

/// Configuration for the Ollama provider.
#[derive(Clone, PartialEq)]
pub struct OllamaConfig {
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) temperature: f32,
    pub(crate) think: Option<bool>,
    pub(crate) timeout: Duration,
    pub(crate) retry_window: Duration,
}

impl OllamaConfig {
    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Debug for OllamaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("temperature", &self.temperature)
            .field("think", &self.think)
            .field("timeout", &self.timeout)
            .field("retry_window", &self.retry_window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OllamaConfigBuilder::with_model("my_qwen").build();
        assert_eq!(config.model(), "my_qwen");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.think, None);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = OllamaConfigBuilder::with_model("my_qwen")
            .with_base_url("http://ollama.internal:11434/")
            .with_api_key("super-secret")
            .build();
        assert_eq!(config.base_url(), "http://ollama.internal:11434");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<deducted>"));
    }
}
