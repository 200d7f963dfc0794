/// Integration tests against real LLM providers.
///
/// These tests need network access and credentials. They are skipped in
/// GitHub Actions and whenever the provider is not configured.
///
/// To run locally:
/// ```bash
/// ANTHROPIC_API_KEY=... cargo test --test llm_integration
/// OLLAMA_MODEL=llama3.1:8b cargo test --test llm_integration
/// ```
use std::sync::Arc;

use finrag::{
    AnswerPipelineBuilder, AnthropicClientBuilder, LlmClient, OllamaClientBuilder, Passage,
    PassageStore, RagConfig,
};

/// Load environment from .env file (same as the CLI)
fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Skip test if running in GitHub Actions
fn skip_in_ci() -> bool {
    if std::env::var("GITHUB_ACTIONS").as_deref() == Ok("true") {
        println!("Skipping test in GitHub Actions (no LLM available)");
        return true;
    }
    false
}

fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| !v.trim().is_empty())
}

fn financial_store() -> PassageStore {
    [
        Passage::new(
            "Revenue grew 10 percent. Costs rose 5 percent. Margin improved.",
            "report.pdf",
            1,
        ),
        Passage::new(
            "Risks include currency exposure. Litigation pending. No material impact expected.",
            "report.pdf",
            2,
        ),
    ]
    .into_iter()
    .collect()
}

fn assert_cited_answer(client: Arc<dyn LlmClient>) {
    let pipeline = AnswerPipelineBuilder::new(client)
        .config(&RagConfig {
            top_k: 1,
            ..RagConfig::default()
        })
        .build();

    let record = pipeline.answer("How much did revenue grow?", &financial_store());
    println!("Answer: {}", record.answer_text());

    assert!(
        !record.is_upstream_failure(),
        "provider call failed: {}",
        record.answer_text()
    );
    assert_eq!(record.sources_used().len(), 1);
    assert!(record.answer_text().contains("10"));
}

/// Test a real Anthropic call through the full pipeline.
#[test]
fn anthropic_answers_with_citation() {
    load_env();
    if skip_in_ci() || !env_is_set("ANTHROPIC_API_KEY") {
        println!("Skipping: ANTHROPIC_API_KEY not set");
        return;
    }

    let client = AnthropicClientBuilder::new()
        .build()
        .expect("Failed to create Anthropic client");
    assert_cited_answer(Arc::new(client));
}

/// Test a real Ollama call through the full pipeline.
///
/// Requires Ollama running (default: http://localhost:11434 or OLLAMA_HOST)
/// and `OLLAMA_MODEL` naming an installed model.
#[test]
fn ollama_answers_with_citation() {
    load_env();
    if skip_in_ci() || !env_is_set("OLLAMA_MODEL") {
        println!("Skipping: OLLAMA_MODEL not set");
        return;
    }

    let client = OllamaClientBuilder::new()
        .build()
        .expect("Failed to create Ollama client");
    assert_cited_answer(Arc::new(client));
}
