//! Formats ranked passages into the size-bounded context block sent to the model.

use crate::ranker::RankedResult;
use crate::utils::{char_len, truncate_chars};

/// Marker appended when the context block is cut.
pub const ELLIPSIS: &str = "...";

/// Separator between context entries.
const ENTRY_SEPARATOR: &str = "\n\n";

/// Builds citation-tagged context blocks under character caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    passage_chars: usize,
    total_chars: usize,
}

impl ContextAssembler {
    /// Creates an assembler with a per-entry cap and a cap on the whole block.
    pub fn new(passage_chars: usize, total_chars: usize) -> Self {
        Self {
            passage_chars,
            total_chars,
        }
    }

    /// Assembles the context for `ranked`, highest relevance first.
    pub fn assemble(&self, ranked: &[RankedResult]) -> String {
        assemble(ranked, self.passage_chars, self.total_chars)
    }
}

/// Formats ranked passages as `[source, p.N]: text` entries separated by a blank line.
///
/// Each entry's text is cut to `passage_chars` characters. If the block then
/// exceeds `total_chars`, it is cut so that, with [`ELLIPSIS`] appended, it is
/// exactly `total_chars` long. The cut may land inside a citation tag. When
/// `total_chars` is smaller than the marker the block is cut without one.
pub fn assemble(ranked: &[RankedResult], passage_chars: usize, total_chars: usize) -> String {
    let context = ranked
        .iter()
        .map(|result| {
            let passage = &result.passage;
            format!(
                "{}: {}",
                passage.citation(),
                truncate_chars(passage.text(), passage_chars)
            )
        })
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR);

    if char_len(&context) <= total_chars {
        return context;
    }

    let marker_len = char_len(ELLIPSIS);
    if total_chars < marker_len {
        return truncate_chars(&context, total_chars).to_string();
    }

    format!(
        "{}{}",
        truncate_chars(&context, total_chars - marker_len),
        ELLIPSIS
    )
}
