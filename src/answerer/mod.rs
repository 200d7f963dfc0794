//! Retrieval-augmented question answering.
//!
//! [`AnswerPipeline`] ranks the stored passages against a question, packs the
//! best ones into a bounded context block and asks an [`LlmClient`] to answer
//! from that context only. The result is an [`AnswerRecord`] whose sources are
//! exactly the passages that were sent.
//!
//! [`LlmClient`]: crate::llm::LlmClient

mod pipeline;
mod types;

pub use pipeline::{AnswerPipeline, AnswerPipelineBuilder, ERROR_PREFIX, build_prompt};
pub use types::{AnswerRecord, UpstreamFailure};
