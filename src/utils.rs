//! Shared text helpers used by the chunker, the context assembler and the CLI.
//!
//! All lengths here are counted in `char`s, never bytes, so a cut can not land
//! inside a multi-byte code point.

/// Collapses every run of whitespace into a single ASCII space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Returns the first `max_chars` characters of `text`.
///
/// This is a hard cut: it is not word-aware and may end mid-word.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Returns a display preview of at most `max_chars` characters followed by `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    format!("{}...", truncate_chars(text, max_chars))
}
