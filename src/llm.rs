//! LLM provider clients.
//!
//! The answer pipeline only needs the [`LlmClient`] capability: send a prompt,
//! get text back or an [`LlmError`]. Model choice, credentials, timeouts and
//! retries are owned by the concrete clients in this module.
mod anthropic;
mod client;
mod ollama;
#[cfg(test)]
mod test_server;

pub use anthropic::{AnthropicClient, AnthropicClientBuilder};
pub use client::{FailureKind, LlmClient, LlmError, retry_with_backoff};
pub use ollama::{OllamaClient, OllamaClientBuilder};
