//! Client for a local Ollama server (`/api/generate`).
use std::time::Duration;

use tracing::debug;

use super::client::{LlmClient, LlmError, http_error, retry_with_backoff};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Builder for constructing `OllamaClient` instances.
///
/// # Examples
///
/// ```
/// use finrag::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("llama3.1:8b")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.model(), "llama3.1:8b");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    retry_delays: Option<Vec<Duration>>,
}

impl OllamaClientBuilder {
    /// Creates a new `OllamaClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Ollama API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model name (e.g., "llama3.1:8b").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides the backoff schedule used for transient failures.
    pub fn retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = Some(delays);
        self
    }

    /// Builds the `OllamaClient`.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, `OLLAMA_HOST` is used, falling back to
    /// `http://localhost:11434`. If `model()` was not called, `OLLAMA_MODEL`
    /// is used, falling back to an empty string.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidUrl` if the base URL does not parse.
    pub fn build(self) -> Result<OllamaClient, LlmError> {
        let base_url = self.base_url.unwrap_or_else(|| {
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string())
        });
        let model = self
            .model
            .unwrap_or_else(|| std::env::var("OLLAMA_MODEL").unwrap_or_default());

        reqwest::Url::parse(&base_url)
            .map_err(|e| LlmError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(LlmError::Network)?;

        Ok(OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            retry_delays: self.retry_delays.unwrap_or_else(default_retry_delays),
        })
    }
}

/// Backoff schedule shared by the HTTP clients: 1s, 2s, 4s.
pub(crate) fn default_retry_delays() -> Vec<Duration> {
    [1, 2, 4].into_iter().map(Duration::from_secs).collect()
}

/// Synchronous HTTP client for the Ollama generate API.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    retry_delays: Vec<Duration>,
}

impl OllamaClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        })
    }
}

impl LlmClient for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.request_body(prompt);
        debug!(model = %self.model, prompt_chars = prompt.len(), "calling ollama");

        retry_with_backoff(&self.retry_delays, || {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .map_err(LlmError::from_transport)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(http_error(status.as_u16(), &body, error_message));
            }

            let json: serde_json::Value = response.json().map_err(LlmError::from_transport)?;
            parse_generate_response(&json)
        })
    }
}

/// Reads `{"error": "..."}`.
fn error_message(json: &serde_json::Value) -> Option<String> {
    json.get("error").and_then(|v| v.as_str()).map(String::from)
}

/// Extracts the completion text from an `/api/generate` response.
fn parse_generate_response(json: &serde_json::Value) -> Result<String, LlmError> {
    if let Some(message) = error_message(json) {
        return Err(LlmError::Api { message });
    }

    json.get("response")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::Api {
            message: "Missing 'response' field in API response".to_string(),
        })
}
