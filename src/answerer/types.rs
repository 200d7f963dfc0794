//! Types for answered questions.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::llm::{FailureKind, LlmError};
use crate::models::Passage;

/// Why an answer could not be produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamFailure {
    kind: FailureKind,
    message: String,
}

impl UpstreamFailure {
    /// Creates a failure record.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the failure category.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the provider error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&LlmError> for UpstreamFailure {
    fn from(error: &LlmError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

/// One question/answer round trip.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    /// The question as asked
    question: String,
    /// Model output verbatim, or a marked error string on failure
    answer_text: String,
    /// Passages placed in the context, in ranked order
    sources_used: Vec<Arc<Passage>>,
    /// Set only when the LLM call failed
    failure: Option<UpstreamFailure>,
    #[serde(with = "time::serde::rfc3339")]
    asked_at: OffsetDateTime,
}

impl AnswerRecord {
    /// Creates a record for a successful model call.
    pub fn answered(
        question: impl Into<String>,
        answer_text: impl Into<String>,
        sources_used: Vec<Arc<Passage>>,
    ) -> Self {
        Self {
            question: question.into(),
            answer_text: answer_text.into(),
            sources_used,
            failure: None,
            asked_at: OffsetDateTime::now_utc(),
        }
    }

    /// Creates a record for a failed model call. Sources are always empty.
    pub fn failed(
        question: impl Into<String>,
        answer_text: impl Into<String>,
        failure: UpstreamFailure,
    ) -> Self {
        Self {
            question: question.into(),
            answer_text: answer_text.into(),
            sources_used: Vec::new(),
            failure: Some(failure),
            asked_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns the question.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Returns the answer text.
    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    /// Returns the passages that were sent to the model.
    pub fn sources_used(&self) -> &[Arc<Passage>] {
        &self.sources_used
    }

    /// Returns the failure, if the model call failed.
    pub fn failure(&self) -> Option<&UpstreamFailure> {
        self.failure.as_ref()
    }

    /// Returns true if the answer text is an upstream error message.
    pub fn is_upstream_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// Returns when the question was answered.
    pub fn asked_at(&self) -> OffsetDateTime {
        self.asked_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answered_record_has_no_failure() {
        let passage = Arc::new(Passage::new("Revenue grew", "a.pdf", 1));
        let record = AnswerRecord::answered("q", "a", vec![Arc::clone(&passage)]);

        assert!(!record.is_upstream_failure());
        assert!(record.failure().is_none());
        assert!(Arc::ptr_eq(&record.sources_used()[0], &passage));
    }

    #[test]
    fn failed_record_has_no_sources() {
        let record = AnswerRecord::failed(
            "q",
            "Error querying LLM: boom",
            UpstreamFailure::new(FailureKind::Network, "boom"),
        );

        assert!(record.is_upstream_failure());
        assert!(record.sources_used().is_empty());
        assert_eq!(record.failure().unwrap().kind(), FailureKind::Network);
        assert_eq!(record.failure().unwrap().message(), "boom");
    }

    #[test]
    fn failure_converts_from_llm_error() {
        let failure = UpstreamFailure::from(&LlmError::Http {
            status: 529,
            message: None,
        });
        assert_eq!(failure.kind(), FailureKind::Http);
        assert!(failure.message().contains("529"));
    }

    #[test]
    fn record_serializes_sources_and_timestamp() {
        let record = AnswerRecord::answered(
            "q",
            "a",
            vec![Arc::new(Passage::new("Revenue grew", "a.pdf", 2))],
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["question"], "q");
        assert_eq!(json["sources_used"][0]["page_number"], 2);
        assert!(json["failure"].is_null());
        assert!(json["asked_at"].as_str().unwrap().contains('T'));
    }
}
