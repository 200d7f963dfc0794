//! BM25 Okapi scoring.
//!
//! IDF is `ln(N - n + 0.5) - ln(n + 0.5)`. Terms that appear in more than
//! half of the passages would get a negative IDF; those are floored at
//! `epsilon` times the mean IDF of the corpus.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::models::Passage;

use super::{RankedResult, Ranker, select_top_k, tokenize};

/// BM25 ranker whose index is rebuilt on every call.
///
/// Rebuilding costs O(total passage tokens) per query. That is fine for a
/// handful of documents and keeps the store free of derived state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Ranker {
    k1: f64,
    b: f64,
    epsilon: f64,
}

impl Default for Bm25Ranker {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

impl Bm25Ranker {
    /// Creates a ranker with custom parameters.
    ///
    /// * `k1` - term-frequency saturation
    /// * `b` - length normalization strength (0.0-1.0)
    /// * `epsilon` - fraction of the mean IDF used as the floor for negative IDFs
    pub fn new(k1: f64, b: f64, epsilon: f64) -> Self {
        Self { k1, b, epsilon }
    }

    /// Scores every passage against `query`, in input order.
    ///
    /// Always returns one score per passage; an empty query scores everything 0.
    /// Scores are always finite: a term absent from a passage contributes
    /// nothing, even for an empty passage under `b = 1`.
    pub fn scores(&self, query: &str, passages: &[Arc<Passage>]) -> Vec<f64> {
        if passages.is_empty() {
            return Vec::new();
        }

        let index = Index::build(passages, self.epsilon);
        let query_terms = tokenize(query);

        index
            .docs
            .iter()
            .map(|doc| {
                let len_norm = 1.0 - self.b + self.b * doc.len as f64 / index.avg_len;
                query_terms
                    .iter()
                    .map(|term| {
                        let idf = index.idf.get(term).copied().unwrap_or(0.0);
                        let tf = doc.freqs.get(term).copied().unwrap_or(0) as f64;
                        let denominator = tf + self.k1 * len_norm;
                        if tf == 0.0 || denominator <= 0.0 {
                            return 0.0;
                        }
                        idf * (tf * (self.k1 + 1.0)) / denominator
                    })
                    .sum::<f64>()
            })
            .map(|score| if score.is_finite() { score } else { 0.0 })
            .collect()
    }
}

impl Ranker for Bm25Ranker {
    fn rank(&self, query: &str, passages: &[Arc<Passage>], k: usize) -> Vec<RankedResult> {
        if passages.is_empty() || k == 0 {
            return Vec::new();
        }

        let scores = self.scores(query, passages);
        let ranked = select_top_k(passages, &scores, k);
        debug!(
            candidates = passages.len(),
            returned = ranked.len(),
            top_score = ranked.first().map(|r| r.score),
            "ranked passages"
        );
        ranked
    }
}

/// Term statistics for one passage.
struct DocStats {
    len: usize,
    freqs: HashMap<String, usize>,
}

/// Corpus statistics for one ranking call.
struct Index {
    docs: Vec<DocStats>,
    avg_len: f64,
    idf: HashMap<String, f64>,
}

impl Index {
    fn build(passages: &[Arc<Passage>], epsilon: f64) -> Self {
        let mut docs = Vec::with_capacity(passages.len());
        // ordered so the IDF mean is summed identically on every call
        let mut doc_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_len = 0usize;

        for passage in passages {
            let tokens = tokenize(passage.text());
            total_len += tokens.len();

            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in tokens.iter() {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_counts.entry(term.clone()).or_insert(0) += 1;
            }

            docs.push(DocStats {
                len: tokens.len(),
                freqs,
            });
        }

        let n = docs.len() as f64;
        let avg_len = if total_len == 0 {
            1.0
        } else {
            total_len as f64 / n
        };

        let mut idf: HashMap<String, f64> = HashMap::with_capacity(doc_counts.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, count) in doc_counts {
            let count = count as f64;
            let value = (n - count + 0.5).ln() - (count + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }

        if !idf.is_empty() {
            let floor = epsilon * idf_sum / idf.len() as f64;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            docs,
            avg_len,
            idf,
        }
    }
}
