//! Splits extracted page text into bounded, page-attributed passages.
//!
//! Sentence detection is a heuristic: page text is cut on the literal
//! delimiter `". "`. Abbreviations such as "U.S. " and some decimal figures
//! therefore produce extra boundaries. Units are grouped into fixed windows
//! that never cross a page.

use tracing::debug;

use crate::config::RagConfig;
use crate::models::Passage;
use crate::utils::{char_len, normalize_whitespace, truncate_chars};

/// Delimiter between sentence-like units.
const SENTENCE_DELIMITER: &str = ". ";

/// Text of a single page as produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub page_number: u32,
    /// Raw extracted text; may be empty for image-only pages.
    pub text: String,
}

impl PageText {
    /// Creates a new page.
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// Groups sentence units into passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    min_chars: usize,
    max_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl Chunker {
    /// Creates a chunker.
    ///
    /// A `window` of zero is treated as one unit and a `max_chars` of zero as
    /// one character, so every kept passage is non-empty.
    pub fn new(window: usize, min_chars: usize, max_chars: usize) -> Self {
        Self {
            window: window.max(1),
            min_chars,
            max_chars: max_chars.max(1),
        }
    }

    /// Creates a chunker from the chunking fields of a `RagConfig`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.window, config.min_chars, config.max_chunk_chars)
    }

    /// Returns the number of sentence units per window.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Chunks the pages of one document.
    ///
    /// Passages come out in page order, then window order within a page.
    pub fn chunk(&self, source_id: &str, pages: &[PageText]) -> Vec<Passage> {
        let mut passages = Vec::new();

        for page in pages {
            let before = passages.len();
            self.chunk_page(source_id, page, &mut passages);
            debug!(
                source_id,
                page = page.page_number,
                passages = passages.len() - before,
                "chunked page"
            );
        }

        passages
    }

    fn chunk_page(&self, source_id: &str, page: &PageText, out: &mut Vec<Passage>) {
        let text = normalize_whitespace(&page.text);
        if text.is_empty() {
            return;
        }

        let units: Vec<&str> = text.split(SENTENCE_DELIMITER).collect();

        for window in units.chunks(self.window) {
            let joined = window.join(SENTENCE_DELIMITER);
            let trimmed = joined.trim();
            if trimmed.is_empty() || char_len(trimmed) <= self.min_chars {
                continue;
            }

            out.push(Passage::new(
                truncate_chars(trimmed, self.max_chars).trim_end(),
                source_id,
                page.page_number,
            ));
        }
    }
}
