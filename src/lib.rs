//! Retrieval-augmented question answering over financial PDF documents.
//!
//! Documents are split into page-attributed passages, ranked against each
//! question with BM25, packed into a bounded context block and sent to an LLM
//! with instructions to answer only from that context and cite its sources.

pub mod answerer;
pub mod chunker;
pub mod config;
pub mod context;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod ranker;
pub mod store;
pub mod utils;

pub use answerer::{AnswerPipeline, AnswerPipelineBuilder, AnswerRecord, UpstreamFailure};
pub use chunker::{Chunker, PageText};
pub use config::{ConfigError, Provider, RagConfig};
pub use context::{ContextAssembler, assemble};
pub use ingest::{
    DocumentFile, DocumentSummary, IngestError, IngestReport, PageExtractor, PdfExtractor,
    process_documents,
};
pub use llm::{
    AnthropicClient, AnthropicClientBuilder, FailureKind, LlmClient, LlmError, OllamaClient,
    OllamaClientBuilder,
};
pub use models::Passage;
pub use ranker::{Bm25Ranker, RankedResult, Ranker};
pub use store::{PassageStore, Session};
