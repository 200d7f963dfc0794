//! End-to-end tests of the ingestion and answering pipeline.
//!
//! These run entirely in-process: page text comes from a fake extractor and
//! the LLM is a mock, so no PDF parser or network access is involved.
use std::sync::{Arc, Mutex};

use finrag::{
    AnswerPipeline, AnswerPipelineBuilder, Bm25Ranker, Chunker, DocumentFile, FailureKind,
    IngestError, LlmClient, LlmError, PageExtractor, RagConfig, Ranker, Session, assemble,
    process_documents,
};

const PAGE_ONE: &str = "Revenue grew 10 percent. Costs rose 5 percent. Margin improved.";
const PAGE_TWO: &str =
    "Risks include currency exposure. Litigation pending. No material impact expected.";

/// Splits UTF-8 bytes into pages on form feeds, as `pdftotext` output does.
struct FormFeedExtractor;

impl PageExtractor for FormFeedExtractor {
    fn extract_pages(&self, source_id: &str, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|e| IngestError::Extraction {
            source_id: source_id.to_string(),
            message: e.to_string(),
        })?;
        Ok(text.split('\x0c').map(String::from).collect())
    }
}

/// Mock LLM that records prompts.
struct MockClient {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    fn answering() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmClient for MockClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            Err(LlmError::Api {
                message: "service unavailable".to_string(),
            })
        } else {
            Ok("Revenue grew 10 percent [report.pdf, p.1].".to_string())
        }
    }
}

fn report_file() -> DocumentFile {
    DocumentFile::new("report.pdf", format!("{PAGE_ONE}\x0c{PAGE_TWO}").into_bytes())
}

fn scenario_config() -> RagConfig {
    RagConfig {
        window: 3,
        min_chars: 0,
        top_k: 1,
        ..RagConfig::default()
    }
}

#[test]
fn two_page_document_answers_from_page_one() {
    let config = scenario_config();
    let report = process_documents(
        &[report_file()],
        &FormFeedExtractor,
        &Chunker::from_config(&config),
    )
    .unwrap();

    // One passage per page
    assert_eq!(report.store.len(), 2);
    assert_eq!(report.store.passages()[0].page_number(), 1);
    assert_eq!(report.store.passages()[1].page_number(), 2);

    // Ranking alone picks page 1
    let ranked = Bm25Ranker::default().rank("What happened to revenue?", report.store.passages(), 1);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].passage.page_number(), 1);

    let context = assemble(&ranked, config.passage_chars, config.context_chars);
    assert!(context.contains("[report.pdf, p.1]"));

    // And the full pipeline sends exactly that passage
    let client = MockClient::answering();
    let pipeline = AnswerPipelineBuilder::new(client.clone())
        .config(&config)
        .build();
    let record = pipeline.answer("What happened to revenue?", &report.store);

    assert_eq!(record.sources_used().len(), 1);
    assert!(Arc::ptr_eq(
        &record.sources_used()[0],
        &report.store.passages()[0]
    ));
    assert_eq!(
        record.answer_text(),
        "Revenue grew 10 percent [report.pdf, p.1]."
    );

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[report.pdf, p.1]: Revenue grew 10 percent."));
    assert!(!prompts[0].contains("p.2"));
    assert!(prompts[0].contains("Question: What happened to revenue?"));
}

#[test]
fn upstream_failure_gives_error_answer_and_no_sources() {
    let config = scenario_config();
    let report = process_documents(
        &[report_file()],
        &FormFeedExtractor,
        &Chunker::from_config(&config),
    )
    .unwrap();

    let pipeline = AnswerPipeline::new(MockClient::failing());
    let record = pipeline.answer("What happened to revenue?", &report.store);

    assert!(!record.answer_text().is_empty());
    assert!(record.answer_text().contains("Error"));
    assert!(record.answer_text().contains("service unavailable"));
    assert!(record.sources_used().is_empty());
    assert_eq!(record.failure().unwrap().kind(), FailureKind::Provider);
}

#[test]
fn sources_match_context_sent_to_model() {
    let pages = [
        "Total revenue was 4.2 billion dollars for the fiscal year",
        "Operating costs increased due to higher headcount and rent",
        "Revenue from the services segment grew faster than products revenue",
        "The board declared a quarterly dividend of 20 cents per share",
    ];
    let file = DocumentFile::new("10k.pdf", pages.join("\x0c").into_bytes());
    let config = RagConfig {
        min_chars: 0,
        top_k: 2,
        ..RagConfig::default()
    };
    let report =
        process_documents(&[file], &FormFeedExtractor, &Chunker::from_config(&config)).unwrap();

    let client = MockClient::answering();
    let pipeline = AnswerPipelineBuilder::new(client.clone())
        .config(&config)
        .build();
    let record = pipeline.answer("revenue growth by segment", &report.store);
    let prompt = &client.prompts()[0];

    // Every source appears in the prompt, in the same order.
    let mut last = 0;
    for source in record.sources_used() {
        let tag = source.citation();
        let pos = prompt[last..]
            .find(&tag)
            .map(|p| p + last)
            .unwrap_or_else(|| panic!("{tag} missing from prompt"));
        last = pos + tag.len();
    }
    assert_eq!(record.sources_used().len(), 2);
    assert_eq!(record.sources_used()[0].page_number(), 3);
}

#[test]
fn session_answers_against_latest_documents() {
    let config = RagConfig {
        min_chars: 0,
        ..RagConfig::default()
    };
    let chunker = Chunker::from_config(&config);
    let pipeline = AnswerPipelineBuilder::new(MockClient::answering())
        .config(&config)
        .build();
    let mut session = Session::new();

    let first = process_documents(&[report_file()], &FormFeedExtractor, &chunker).unwrap();
    session.replace_store(first.store);
    let before = session.snapshot();

    let second = process_documents(
        &[DocumentFile::new(
            "other.pdf",
            b"Cash reserves stayed flat.".to_vec(),
        )],
        &FormFeedExtractor,
        &chunker,
    )
    .unwrap();
    session.replace_store(second.store);

    let record = session.ask(&pipeline, "What about cash?");
    assert!(
        record
            .sources_used()
            .iter()
            .all(|p| p.source_id() == "other.pdf")
    );
    assert_eq!(before.len(), 2);
    assert_eq!(session.history().len(), 1);
}

#[test]
fn bad_document_leaves_session_store_untouched() {
    let chunker = Chunker::default();
    let mut session = Session::new();
    let good = process_documents(&[report_file()], &FormFeedExtractor, &chunker).unwrap();
    session.replace_store(good.store);
    let version = session.version();

    let result = process_documents(
        &[report_file(), DocumentFile::new("broken.pdf", vec![0xc3, 0x28])],
        &FormFeedExtractor,
        &chunker,
    );

    assert!(result.is_err());
    assert_eq!(session.version(), version);
}

#[test]
fn ranking_is_repeatable_across_calls() {
    let config = RagConfig {
        window: 1,
        min_chars: 0,
        ..RagConfig::default()
    };
    let report = process_documents(
        &[report_file(), report_file()],
        &FormFeedExtractor,
        &Chunker::from_config(&config),
    )
    .unwrap();

    let ranker = Bm25Ranker::default();
    for query in ["revenue", "litigation pending", "", "?!"] {
        let a = ranker.rank(query, report.store.passages(), 4);
        let b = ranker.rank(query, report.store.passages(), 4);
        assert_eq!(a, b, "query {query:?}");
        assert_eq!(a.len(), 4);
    }
}
