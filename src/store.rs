//! Passage storage and per-session state.
//!
//! A [`PassageStore`] is built once per document batch and never edited in
//! place; re-processing or clearing swaps in a new one. The [`Session`] holds
//! the current store behind an `Arc` together with the answer history, so a
//! query works on a snapshot while replacement needs `&mut Session`.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::answerer::{AnswerPipeline, AnswerRecord};
use crate::models::Passage;

/// Ordered collection of passages across all processed documents.
///
/// Order is extraction order: documents in the order given, then pages, then
/// windows. Duplicate text is allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassageStore {
    passages: Vec<Arc<Passage>>,
}

impl PassageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the passages in insertion order.
    pub fn passages(&self) -> &[Arc<Passage>] {
        &self.passages
    }

    /// Returns the number of passages.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Returns true if the store holds no passages.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Appends passages, preserving their order.
    ///
    /// Only used while a store is being built; a published store is never extended.
    pub(crate) fn extend(&mut self, passages: impl IntoIterator<Item = Passage>) {
        self.passages.extend(passages.into_iter().map(Arc::new));
    }
}

impl FromIterator<Passage> for PassageStore {
    fn from_iter<I: IntoIterator<Item = Passage>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

/// The documents and answer history of one user session.
#[derive(Debug, Default)]
pub struct Session {
    store: Arc<PassageStore>,
    version: u64,
    history: Vec<AnswerRecord>,
}

impl Session {
    /// Creates a session with no documents and no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current store.
    pub fn snapshot(&self) -> Arc<PassageStore> {
        Arc::clone(&self.store)
    }

    /// Returns how many times the store has been replaced or cleared.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replaces the whole store with a newly processed one.
    pub fn replace_store(&mut self, store: PassageStore) {
        self.version += 1;
        info!(
            version = self.version,
            passages = store.len(),
            "replaced passage store"
        );
        self.store = Arc::new(store);
    }

    /// Drops all documents and the answer history.
    pub fn clear(&mut self) {
        self.replace_store(PassageStore::new());
        self.history.clear();
    }

    /// Drops the answer history but keeps documents.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Returns past answers, oldest first.
    pub fn history(&self) -> &[AnswerRecord] {
        &self.history
    }

    /// Answers `question` against the current store and records the result.
    pub fn ask(&mut self, pipeline: &AnswerPipeline, question: &str) -> &AnswerRecord {
        let store = self.snapshot();
        let record = pipeline.answer(question, &store);
        self.history.push(record);
        &self.history[self.history.len() - 1]
    }
}
