//! Tunable retrieval parameters.
//!
//! Defaults: three-sentence windows, a 50 character floor, 500 character
//! passages, top three results, 300 characters per context entry and a 3000
//! character context block.

use std::str::FromStr;

use thiserror::Error;

/// Environment variable overriding [`RagConfig::window`].
pub const ENV_WINDOW: &str = "FINRAG_WINDOW";
/// Environment variable overriding [`RagConfig::min_chars`].
pub const ENV_MIN_CHARS: &str = "FINRAG_MIN_CHARS";
/// Environment variable overriding [`RagConfig::max_chunk_chars`].
pub const ENV_MAX_CHUNK_CHARS: &str = "FINRAG_MAX_CHUNK_CHARS";
/// Environment variable overriding [`RagConfig::top_k`].
pub const ENV_TOP_K: &str = "FINRAG_TOP_K";
/// Environment variable overriding [`RagConfig::passage_chars`].
pub const ENV_PASSAGE_CHARS: &str = "FINRAG_PASSAGE_CHARS";
/// Environment variable overriding [`RagConfig::context_chars`].
pub const ENV_CONTEXT_CHARS: &str = "FINRAG_CONTEXT_CHARS";

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed as a non-negative integer.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidNumber { key: String, value: String },

    /// A value parsed but is outside the accepted range.
    #[error("{key} must be at least {min}, got {value}")]
    OutOfRange { key: String, value: usize, min: usize },

    /// The requested LLM provider is unknown.
    #[error("Unknown provider {0:?} (expected \"anthropic\" or \"ollama\")")]
    UnknownProvider(String),
}

/// Retrieval and context-assembly parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RagConfig {
    /// Number of sentence units grouped into one passage.
    pub window: usize,
    /// Windows whose length in characters is not above this are dropped.
    pub min_chars: usize,
    /// Hard cap on passage length in characters.
    pub max_chunk_chars: usize,
    /// Number of ranked passages sent to the model.
    pub top_k: usize,
    /// Per-entry character cap inside the context block.
    pub passage_chars: usize,
    /// Character cap on the whole context block.
    pub context_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            window: 3,
            min_chars: 50,
            max_chunk_chars: 500,
            top_k: 3,
            passage_chars: 300,
            context_chars: 3000,
        }
    }
}

impl RagConfig {
    /// Builds a configuration from defaults overridden by `FINRAG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a variable is set to something that is not a
    /// valid value for its field.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from defaults overridden by the given lookup.
    ///
    /// `lookup` maps a variable name to its value, if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let read = |key: &str, target: &mut usize| -> Result<(), ConfigError> {
            if let Some(raw) = lookup(key) {
                *target = parse_number(key, &raw)?;
            }
            Ok(())
        };

        read(ENV_WINDOW, &mut config.window)?;
        read(ENV_MIN_CHARS, &mut config.min_chars)?;
        read(ENV_MAX_CHUNK_CHARS, &mut config.max_chunk_chars)?;
        read(ENV_TOP_K, &mut config.top_k)?;
        read(ENV_PASSAGE_CHARS, &mut config.passage_chars)?;
        read(ENV_CONTEXT_CHARS, &mut config.context_chars)?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that every field is in range.
    ///
    /// `window` and `max_chunk_chars` must be at least 1; a zero-length passage
    /// or a zero-unit window can not exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_min(ENV_WINDOW, self.window, 1)?;
        ensure_min(ENV_MAX_CHUNK_CHARS, self.max_chunk_chars, 1)?;
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> Result<usize, ConfigError> {
    usize::from_str(raw.trim()).map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn ensure_min(key: &str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value,
            min,
        });
    }
    Ok(())
}

/// Which LLM backend answers questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Anthropic Messages API.
    #[default]
    Anthropic,
    /// Local Ollama server.
    Ollama,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}
