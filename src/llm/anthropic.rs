//! Client for the Anthropic Messages API.
use std::time::Duration;

use tracing::debug;

use super::client::{LlmClient, LlmError, http_error, retry_with_backoff};
use super::ollama::default_retry_delays;

/// Default API endpoint.
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
/// Model used when neither the builder nor `ANTHROPIC_MODEL` names one.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
/// Completion length cap sent with every request.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

const API_VERSION: &str = "2023-06-01";
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Builder for constructing `AnthropicClient` instances.
///
/// Values set on the builder win over environment variables
/// (`ANTHROPIC_API_KEY`, `ANTHROPIC_MODEL`, `ANTHROPIC_BASE_URL`), which win
/// over the defaults.
#[derive(Debug, Default)]
pub struct AnthropicClientBuilder {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    retry_delays: Option<Vec<Duration>>,
}

impl AnthropicClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the completion length cap.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Overrides the backoff schedule used for transient failures.
    pub fn retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = Some(delays);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingApiKey` if no key is configured and
    /// `LlmError::InvalidUrl` if the base URL does not parse.
    pub fn build(self) -> Result<AnthropicClient, LlmError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var(API_KEY_VAR).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey(API_KEY_VAR))?;
        let model = self.model.unwrap_or_else(|| {
            std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string())
        });
        let base_url = self.base_url.unwrap_or_else(|| {
            std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.to_string())
        });

        reqwest::Url::parse(&base_url)
            .map_err(|e| LlmError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(LlmError::Network)?;

        Ok(AnthropicClient {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            retry_delays: self.retry_delays.unwrap_or_else(default_retry_delays),
        })
    }
}

/// Synchronous HTTP client for `POST /v1/messages`.
pub struct AnthropicClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    retry_delays: Vec<Duration>,
}

impl AnthropicClient {
    /// Returns the model name configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        })
    }
}

impl LlmClient for AnthropicClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(prompt);
        debug!(model = %self.model, prompt_chars = prompt.len(), "calling anthropic");

        retry_with_backoff(&self.retry_delays, || {
            let response = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
                .map_err(LlmError::from_transport)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(http_error(status.as_u16(), &body, error_message));
            }

            let json: serde_json::Value = response.json().map_err(LlmError::from_transport)?;
            parse_messages_response(&json)
        })
    }
}

/// Reads `{"error": {"message": ...}}`.
fn error_message(json: &serde_json::Value) -> Option<String> {
    json.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(String::from)
}

/// Concatenates the text blocks of a Messages API response.
fn parse_messages_response(json: &serde_json::Value) -> Result<String, LlmError> {
    if let Some(message) = error_message(json) {
        return Err(LlmError::Api { message });
    }

    let blocks = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| LlmError::Api {
            message: "Missing 'content' array in API response".to_string(),
        })?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(LlmError::Api {
            message: "No text content in API response".to_string(),
        });
    }

    Ok(text.concat())
}
