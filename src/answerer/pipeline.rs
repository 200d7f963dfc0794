//! Rank, assemble, prompt, call.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::llm::LlmClient;
use crate::ranker::{Bm25Ranker, Ranker};
use crate::store::PassageStore;

use super::types::{AnswerRecord, UpstreamFailure};

/// Prefix of the answer text when the model call fails.
pub const ERROR_PREFIX: &str = "Error querying LLM: ";

/// Instructions placed before the context block.
const INSTRUCTIONS: &str = "You are a financial research assistant. Answer the question using ONLY the context below. \
Cite the source of every fact with its tag exactly as written, e.g. [report.pdf, p.3]. \
If the context does not contain the answer, say so instead of guessing.";

/// Builds the prompt sent to the model.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{INSTRUCTIONS}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:")
}

/// Builder for constructing `AnswerPipeline` instances.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use finrag::{AnswerPipelineBuilder, LlmClient, LlmError, RagConfig};
///
/// struct Canned;
///
/// impl LlmClient for Canned {
///     fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
///         Ok("Revenue grew 10 percent [q3.pdf, p.1].".to_string())
///     }
/// }
///
/// let pipeline = AnswerPipelineBuilder::new(Arc::new(Canned))
///     .config(&RagConfig { top_k: 5, ..RagConfig::default() })
///     .build();
/// assert_eq!(pipeline.top_k(), 5);
/// ```
pub struct AnswerPipelineBuilder {
    client: Arc<dyn LlmClient>,
    ranker: Option<Arc<dyn Ranker>>,
    config: RagConfig,
}

impl AnswerPipelineBuilder {
    /// Creates a builder around the client that will answer questions.
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            ranker: None,
            config: RagConfig::default(),
        }
    }

    /// Replaces the default BM25 ranker.
    pub fn ranker(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    /// Takes `top_k` and the context caps from `config`.
    pub fn config(mut self, config: &RagConfig) -> Self {
        self.config = *config;
        self
    }

    /// Builds the `AnswerPipeline`.
    #[must_use]
    pub fn build(self) -> AnswerPipeline {
        AnswerPipeline {
            client: self.client,
            ranker: self
                .ranker
                .unwrap_or_else(|| Arc::new(Bm25Ranker::default())),
            top_k: self.config.top_k,
            assembler: ContextAssembler::new(
                self.config.passage_chars,
                self.config.context_chars,
            ),
        }
    }
}

/// Answers questions over a passage store using an LLM.
pub struct AnswerPipeline {
    client: Arc<dyn LlmClient>,
    ranker: Arc<dyn Ranker>,
    top_k: usize,
    assembler: ContextAssembler,
}

impl AnswerPipeline {
    /// Creates a pipeline with the default ranker and configuration.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        AnswerPipelineBuilder::new(client).build()
    }

    /// Returns how many passages are sent per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answers `question` from the passages in `store`.
    ///
    /// Never fails: if the model call errors, the record carries an answer
    /// text starting with [`ERROR_PREFIX`], no sources and the failure kind.
    /// An empty store is not special-cased; the model simply sees an empty
    /// context.
    pub fn answer(&self, question: &str, store: &PassageStore) -> AnswerRecord {
        let ranked = self.ranker.rank(question, store.passages(), self.top_k);
        let context = self.assembler.assemble(&ranked);
        let prompt = build_prompt(&context, question);

        info!(
            candidates = store.len(),
            ranked = ranked.len(),
            context_chars = context.chars().count(),
            "answering question"
        );

        match self.client.generate(&prompt) {
            Ok(answer_text) => {
                let sources = ranked.into_iter().map(|r| r.passage).collect();
                AnswerRecord::answered(question, answer_text, sources)
            }
            Err(error) => {
                warn!(kind = %error.kind(), error = %error, "LLM call failed");
                AnswerRecord::failed(
                    question,
                    format!("{ERROR_PREFIX}{error}"),
                    UpstreamFailure::from(&error),
                )
            }
        }
    }
}
