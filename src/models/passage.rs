use serde::{Deserialize, Serialize};
use std::fmt;

/// A bounded span of extracted document text with its source attribution.
///
/// Passages are the atomic unit of retrieval. They are produced by the
/// [`Chunker`](crate::Chunker) and never mutated afterwards; the store hands
/// them out as `Arc<Passage>` so that ranked results and answer sources refer
/// to the very same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    text: String,
    source_id: String,
    page_number: u32,
}

impl Passage {
    /// Creates a new passage.
    ///
    /// The text is stored as given. Passages built by the chunker are never
    /// empty and never longer than its `max_chars`; other callers should keep
    /// to the same bounds. An empty passage is still accepted and simply
    /// never matches a query.
    pub fn new(text: impl Into<String>, source_id: impl Into<String>, page_number: u32) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            page_number,
        }
    }

    /// Returns the passage text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the originating document identifier (usually the filename).
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns the 1-based page number within the source document.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Returns the citation tag for this passage, e.g. `[report.pdf, p.3]`.
    pub fn citation(&self) -> String {
        format!("[{}, p.{}]", self.source_id, self.page_number)
    }
}

impl fmt::Display for Passage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.citation(), self.text)
    }
}
