//! Document ingestion: PDF bytes to a fresh passage store.
//!
//! Page text comes from a [`PageExtractor`]. The default [`PdfExtractor`]
//! uses the pure-Rust `pdf-extract` crate. Scanned or image-only pages come
//! back empty and silently produce no passages.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::chunker::{Chunker, PageText};
use crate::store::PassageStore;

/// Errors raised while reading documents.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The bytes do not start with a PDF header.
    #[error("{source_id} is not a PDF file")]
    NotPdf { source_id: String },

    /// The PDF could not be parsed.
    #[error("Failed to extract text from {source_id}: {message}")]
    Extraction { source_id: String, message: String },

    /// The file could not be read from disk.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An uploaded document: its identifier and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    /// Identifier used in citations, normally the file name.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    /// Creates a document from a name and its bytes.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads a document from disk, naming it after the file name.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Io` if the file can not be read.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

/// Splits a document into per-page text.
pub trait PageExtractor {
    /// Returns the text of every page, in page order.
    ///
    /// `source_id` is only used for error messages.
    fn extract_pages(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<String>, IngestError>;
}

/// Extracts page text from PDF bytes with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    fn extract_pages(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
        if !bytes_look_like_pdf(bytes) {
            return Err(IngestError::NotPdf {
                source_id: source_id.to_string(),
            });
        }

        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| IngestError::Extraction {
            source_id: source_id.to_string(),
            message: e.to_string(),
        })
    }
}

/// Best-effort sniff for PDF bytes (magic header).
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Per-document processing outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub source_id: String,
    pub page_count: usize,
    pub chunk_count: usize,
}

impl std::fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} pages, {} chunks)",
            self.source_id, self.page_count, self.chunk_count
        )
    }
}

/// Result of processing a batch of documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub store: PassageStore,
    pub summaries: Vec<DocumentSummary>,
}

/// Builds a new passage store from `files`, in the order given.
///
/// The batch is all-or-nothing: the first unreadable document aborts it, so a
/// caller's existing store is only replaced by a fully processed one.
///
/// # Errors
///
/// Returns the extractor's `IngestError` for the first failing document.
pub fn process_documents(
    files: &[DocumentFile],
    extractor: &dyn PageExtractor,
    chunker: &Chunker,
) -> Result<IngestReport, IngestError> {
    let mut report = IngestReport::default();

    for file in files {
        let pages: Vec<PageText> = extractor
            .extract_pages(&file.name, &file.bytes)?
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText::new(i as u32 + 1, text))
            .collect();

        let passages = chunker.chunk(&file.name, &pages);
        let summary = DocumentSummary {
            source_id: file.name.clone(),
            page_count: pages.len(),
            chunk_count: passages.len(),
        };
        info!(
            source_id = %summary.source_id,
            pages = summary.page_count,
            chunks = summary.chunk_count,
            "processed document"
        );

        report.store.extend(passages);
        report.summaries.push(summary);
    }

    Ok(report)
}
