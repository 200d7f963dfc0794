//! The text-completion capability and its error type.
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::utils::truncate_chars;

/// Errors that can occur when calling an LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Non-success HTTP status from the provider, with its error message when
    /// the body carried one
    #[error("HTTP error: status {status}{}", detail(.message))]
    Http {
        status: u16,
        message: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The provider answered but the payload was unusable
    #[error("Provider API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No credentials were configured for a provider that needs them
    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),
}

impl LlmError {
    /// Wraps a reqwest error, separating timeouts from other transport failures.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }

    /// Returns the coarse category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Http { .. } => FailureKind::Http,
            Self::Serialization(_) | Self::Api { .. } => FailureKind::Provider,
            Self::InvalidUrl(_) | Self::MissingApiKey(_) => FailureKind::Configuration,
        }
    }

    /// Returns true for transient errors worth retrying.
    ///
    /// Network errors, timeouts and HTTP 5xx are transient. HTTP 4xx, payload
    /// and configuration errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => (500..600).contains(status),
            Self::Serialization(_)
            | Self::Api { .. }
            | Self::InvalidUrl(_)
            | Self::MissingApiKey(_) => false,
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// Characters of a non-JSON error body kept in [`LlmError::Http`].
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Builds the error for a non-success response.
///
/// `extract` pulls the provider's message out of a JSON error body. A body
/// that is not JSON is kept as plain text, trimmed and shortened.
pub(crate) fn http_error(
    status: u16,
    body: &str,
    extract: fn(&serde_json::Value) -> Option<String>,
) -> LlmError {
    let message = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => extract(&json),
        Err(_) => {
            let trimmed = body.trim();
            (!trimmed.is_empty())
                .then(|| truncate_chars(trimmed, MAX_ERROR_BODY_CHARS).to_string())
        }
    };
    LlmError::Http { status, message }
}

/// Coarse classification of a provider failure, surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Timeout,
    Http,
    Provider,
    Configuration,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Http => write!(f, "http"),
            Self::Provider => write!(f, "provider"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// A text-completion service.
///
/// This trait enables mocking in unit tests and keeps the pipeline ignorant of
/// which provider, model or credentials are in use.
pub trait LlmClient: Send + Sync {
    /// Sends `prompt` as a single request and returns the completion text.
    fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Runs `f`, retrying transient failures once per entry in `delays`.
///
/// Sleeps for the corresponding delay before each retry. Non-transient errors
/// are returned immediately; if every attempt fails, the last error is returned.
pub fn retry_with_backoff<F, T>(delays: &[Duration], mut f: F) -> Result<T, LlmError>
where
    F: FnMut() -> Result<T, LlmError>,
{
    let mut last_error = match f() {
        Ok(result) => return Ok(result),
        Err(e) if !e.is_transient() => return Err(e),
        Err(e) => e,
    };

    for (attempt, delay) in delays.iter().enumerate() {
        warn!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %last_error,
            "retrying LLM request"
        );
        thread::sleep(*delay);

        match f() {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}
