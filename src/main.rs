use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use finrag::utils::preview;
use finrag::{
    AnswerPipeline, AnswerPipelineBuilder, AnswerRecord, AnthropicClientBuilder, Chunker,
    ConfigError, DocumentFile, FailureKind, IngestError, IngestReport, LlmClient, LlmError,
    OllamaClientBuilder, PdfExtractor, Provider, RagConfig, Session, process_documents,
};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Characters of passage text shown under each cited source.
const SOURCE_PREVIEW_CHARS: usize = 200;

/// finrag - ask questions about financial PDFs
#[derive(Parser)]
#[command(name = "finrag")]
#[command(about = "Answer questions about financial PDF documents with cited sources")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args)]
struct GlobalOptions {
    /// LLM provider: anthropic or ollama (default: $FINRAG_PROVIDER or anthropic)
    #[arg(long, global = true, value_name = "PROVIDER")]
    provider: Option<String>,

    /// Model name passed to the provider
    #[arg(long, global = true, value_name = "MODEL")]
    model: Option<String>,

    /// Number of passages sent with each question
    #[arg(short = 'k', long, global = true, value_name = "N")]
    top_k: Option<usize>,

    /// Sentences per passage
    #[arg(long, global = true, value_name = "N")]
    window: Option<usize>,

    /// Drop passages of this many characters or fewer
    #[arg(long, global = true, value_name = "N")]
    min_chars: Option<usize>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask(AskCommand),
    /// Ask questions interactively from stdin
    Chat(ChatCommand),
    /// Show how documents were split into passages
    Chunks(ChunksCommand),
}

/// Answer one question about the given documents
#[derive(Parser)]
struct AskCommand {
    /// The question to answer
    #[arg(value_name = "QUESTION")]
    question: String,

    /// PDF files to search (repeatable)
    #[arg(short, long = "file", value_name = "PDF", required = true)]
    files: Vec<PathBuf>,
}

/// Interactive question loop
#[derive(Parser)]
struct ChatCommand {
    /// PDF files to search (repeatable)
    #[arg(short, long = "file", value_name = "PDF", required = true)]
    files: Vec<PathBuf>,
}

/// Passage inspection
#[derive(Parser)]
struct ChunksCommand {
    /// PDF files to split (repeatable)
    #[arg(short, long = "file", value_name = "PDF", required = true)]
    files: Vec<PathBuf>,
}

/// Errors caused by how the tool was invoked rather than by a failure inside it.
#[derive(Debug, Error)]
enum UsageError {
    #[error("Question cannot be empty")]
    EmptyQuestion,

    #[error("No text could be extracted from the given documents")]
    NoPassages,
}

/// The answer was printed, but the model call behind it failed.
#[derive(Debug, Error)]
#[error("LLM request failed ({0})")]
struct UpstreamError(FailureKind);

/// What the chat loop does after handling one line.
#[derive(Debug, PartialEq, Eq)]
enum ChatStep {
    Continue,
    Quit,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.options.verbose);

    let result = match &cli.command {
        Commands::Ask(cmd) => handle_ask(cmd, &cli.options),
        Commands::Chat(cmd) => handle_chat(cmd, &cli.options),
        Commands::Chunks(cmd) => handle_chunks(cmd, &cli.options),
    };

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,finrag=debug"
    } else {
        "warn,finrag=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad input: empty questions, unreadable or non-PDF files,
/// invalid settings and missing credentials. Everything else is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<UsageError>()
            || cause.is::<ConfigError>()
            || cause.is::<IngestError>()
            || matches!(
                cause.downcast_ref::<LlmError>(),
                Some(LlmError::MissingApiKey(_) | LlmError::InvalidUrl(_))
            )
    })
}

/// Resolves retrieval settings: defaults, then `FINRAG_*` variables, then flags.
fn resolve_config(options: &GlobalOptions) -> Result<RagConfig> {
    let mut config = RagConfig::from_env()?;
    if let Some(top_k) = options.top_k {
        config.top_k = top_k;
    }
    if let Some(window) = options.window {
        config.window = window;
    }
    if let Some(min_chars) = options.min_chars {
        config.min_chars = min_chars;
    }
    config.validate()?;
    Ok(config)
}

/// Builds the LLM client selected by `--provider` or `FINRAG_PROVIDER`.
fn build_client(options: &GlobalOptions) -> Result<Arc<dyn LlmClient>> {
    let provider = match options
        .provider
        .clone()
        .or_else(|| std::env::var("FINRAG_PROVIDER").ok())
    {
        Some(name) => name.parse::<Provider>()?,
        None => Provider::default(),
    };
    tracing::debug!(%provider, "selected LLM provider");

    let client: Arc<dyn LlmClient> = match provider {
        Provider::Anthropic => {
            let mut builder = AnthropicClientBuilder::new();
            if let Some(model) = &options.model {
                builder = builder.model(model);
            }
            Arc::new(builder.build().context("Failed to configure Anthropic client")?)
        }
        Provider::Ollama => {
            let mut builder = OllamaClientBuilder::new();
            if let Some(model) = &options.model {
                builder = builder.model(model);
            }
            Arc::new(builder.build().context("Failed to configure Ollama client")?)
        }
    };
    Ok(client)
}

/// Reads and processes the given PDF files into a passage store.
fn load_documents(files: &[PathBuf], config: &RagConfig) -> Result<IngestReport> {
    let documents = files
        .iter()
        .map(|path| DocumentFile::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    let report = process_documents(&documents, &PdfExtractor, &Chunker::from_config(config))
        .context("Failed to process documents")?;

    for summary in &report.summaries {
        eprintln!("Processed {summary}");
    }
    eprintln!("Total: {} chunks", report.store.len());

    Ok(report)
}

/// Loads documents and builds the pipeline shared by `ask` and `chat`.
fn prepare(files: &[PathBuf], options: &GlobalOptions) -> Result<(Session, AnswerPipeline)> {
    let config = resolve_config(options)?;
    let report = load_documents(files, &config)?;
    if report.store.is_empty() {
        return Err(UsageError::NoPassages.into());
    }

    let pipeline = AnswerPipelineBuilder::new(build_client(options)?)
        .config(&config)
        .build();

    let mut session = Session::new();
    session.replace_store(report.store);
    Ok((session, pipeline))
}

/// Handles the ask command.
fn handle_ask(cmd: &AskCommand, options: &GlobalOptions) -> Result<()> {
    let question = cmd.question.trim();
    if question.is_empty() {
        return Err(UsageError::EmptyQuestion.into());
    }

    let (mut session, pipeline) = prepare(&cmd.files, options)?;
    let record = session.ask(&pipeline, question);
    print_record(record, options.json, &mut std::io::stdout().lock())?;
    check_answer(record)
}

/// Turns an upstream failure into an internal error so the process exits 2.
fn check_answer(record: &AnswerRecord) -> Result<()> {
    match record.failure() {
        Some(failure) => Err(UpstreamError(failure.kind()).into()),
        None => Ok(()),
    }
}

/// Handles the chat command.
///
/// Each non-empty line is a question; see [`chat_step`] for the commands.
fn handle_chat(cmd: &ChatCommand, options: &GlobalOptions) -> Result<()> {
    let (mut session, pipeline) = prepare(&cmd.files, options)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    eprintln!("Ask a question (:history, :status, :clear, :clear-all, :quit)");
    loop {
        print!("> ");
        stdout.flush().context("Failed to write prompt")?;

        let mut line = String::new();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read question")?
            == 0
        {
            break;
        }

        let step = chat_step(&mut session, &pipeline, &line, options.json, &mut stdout.lock())?;
        if step == ChatStep::Quit {
            break;
        }
    }

    Ok(())
}

/// Handles one line of chat input.
///
/// `:history` lists past questions, `:status` shows what is loaded, `:clear`
/// forgets the history, `:clear-all` also drops the documents and `:quit`
/// exits. Anything else is a question.
fn chat_step(
    session: &mut Session,
    pipeline: &AnswerPipeline,
    line: &str,
    json: bool,
    out: &mut impl Write,
) -> Result<ChatStep> {
    match line.trim() {
        "" => {}
        ":quit" | ":q" => return Ok(ChatStep::Quit),
        ":clear" => {
            session.clear_history();
            writeln!(out, "History cleared.")?;
        }
        ":clear-all" => {
            session.clear();
            writeln!(out, "Documents and history cleared.")?;
        }
        ":status" => {
            writeln!(
                out,
                "{} passages loaded (store version {}), {} questions asked",
                session.snapshot().len(),
                session.version(),
                session.history().len()
            )?;
        }
        ":history" => {
            let format = time::macros::format_description!("[hour]:[minute]:[second]");
            for (i, record) in session.history().iter().enumerate() {
                let asked_at = record
                    .asked_at()
                    .format(&format)
                    .context("Failed to format question time")?;
                writeln!(out, "{}. [{asked_at}] {}", i + 1, record.question())?;
            }
        }
        question => {
            if session.snapshot().is_empty() {
                writeln!(out, "No documents loaded. Restart with --file to add some.")?;
            } else {
                let record = session.ask(pipeline, question);
                print_record(record, json, out)?;
            }
        }
    }
    Ok(ChatStep::Continue)
}

/// Handles the chunks command.
fn handle_chunks(cmd: &ChunksCommand, options: &GlobalOptions) -> Result<()> {
    let config = resolve_config(options)?;
    let report = load_documents(&cmd.files, &config)?;

    if options.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize passages")?;
        println!("{json}");
        return Ok(());
    }

    for passage in report.store.passages() {
        println!("{passage}\n");
    }
    Ok(())
}

/// Writes an answer followed by its sources.
fn print_record(record: &AnswerRecord, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(record).context("Failed to serialize answer")?;
        writeln!(out, "{json}")?;
        return Ok(());
    }

    writeln!(out, "{}", record.answer_text())?;
    if !record.sources_used().is_empty() {
        writeln!(out, "\nSources:")?;
        for source in record.sources_used() {
            writeln!(out, "- {} - Page {}", source.source_id(), source.page_number())?;
            writeln!(out, "  {}", preview(source.text(), SOURCE_PREVIEW_CHARS))?;
        }
    }
    writeln!(out)?;
    Ok(())
}
