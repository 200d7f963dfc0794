//! Lexical relevance ranking over the passage store.
//!
//! Ranking sits behind the [`Ranker`] trait so the pipeline does not depend on
//! how scores are computed. The shipped implementation, [`Bm25Ranker`],
//! rebuilds its statistics from scratch on every call.

mod bm25;

use std::sync::Arc;

use serde::Serialize;

use crate::models::Passage;

pub use bm25::Bm25Ranker;

/// A passage paired with its relevance score for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// The scored passage, shared with the store it came from.
    pub passage: Arc<Passage>,
    /// Relevance score; higher is better.
    pub score: f64,
}

/// Scores passages against a query and returns the best `k`.
///
/// Implementations must be deterministic: identical inputs give identical
/// output, with ties resolved by the passages' input order. The result length
/// is `min(k, passages.len())`.
pub trait Ranker: Send + Sync {
    fn rank(&self, query: &str, passages: &[Arc<Passage>], k: usize) -> Vec<RankedResult>;
}

/// Lowercases `text` and splits it on whitespace.
///
/// The same rule is applied to queries and passages so their terms are
/// comparable. Punctuation stays attached to words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Sorts scored passages by descending score, keeping input order on ties,
/// and keeps the first `k`.
pub(crate) fn select_top_k(passages: &[Arc<Passage>], scores: &[f64], k: usize) -> Vec<RankedResult> {
    let mut order: Vec<usize> = (0..passages.len()).collect();
    // sort_by is stable, so equal scores keep insertion order
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    order
        .into_iter()
        .take(k)
        .map(|i| RankedResult {
            passage: Arc::clone(&passages[i]),
            score: scores[i],
        })
        .collect()
}
