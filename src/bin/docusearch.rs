//! CLI binary for docusearch.
//!
//! A thin shim over the library crate: maps CLI flags to `QueryConfig`,
//! loads one document into a `Session`, then answers one question or reads
//! questions from stdin.

use anyhow::{Context, Result};
use clap::Parser;
use docusearch::completion::CompletionClient;
use docusearch::{
    ErrorState, IngestStatus, Language, MediaType, ProviderClient, QueryConfig, QueryService,
    QueryStatus, Session, SessionObserver, UploadedFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: one spinner per parse or search, replaced by a status
/// line when the operation ends.
struct CliObserver {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
        })
    }

    fn start(&self, prefix: &str, message: String) {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Some(previous) = self.spinner.lock().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn finish(&self, line: String) {
        if let Some(bar) = self.spinner.lock().take() {
            bar.finish_and_clear();
        }
        eprintln!("{line}");
    }
}

impl SessionObserver for CliObserver {
    fn on_ingest_start(&self, file_name: &str) {
        self.start("Parsing", file_name.to_string());
    }

    fn on_ingest_complete(&self, file_name: &str, char_count: usize) {
        let mark = if char_count == 0 { cyan("⚠") } else { green("✓") };
        self.finish(format!(
            "{mark} {}  {}",
            bold(file_name),
            dim(&format!("{char_count} chars"))
        ));
    }

    fn on_ingest_error(&self, file_name: &str, error: &ErrorState) {
        self.finish(format!("{} {}  {}", red("✗"), bold(file_name), red(&error.message)));
    }

    fn on_ingest_superseded(&self, file_name: &str) {
        self.finish(dim(&format!("{file_name}: superseded")));
    }

    fn on_search_start(&self, question: &str) {
        let shown: String = question.chars().take(60).collect();
        self.start("Searching", shown);
    }

    fn on_search_complete(&self, _answer_len: usize) {
        if let Some(bar) = self.spinner.lock().take() {
            bar.finish_and_clear();
        }
    }

    fn on_search_error(&self, error: &ErrorState) {
        self.finish(format!("{} {}", red("✗"), red(&error.message)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One question, answer on stdout
  docusearch guide.pdf "Comment configurer le proxy ?"

  # Answers in English
  docusearch --language en manual.docx "How do I rotate the logs?"

  # Interactive: one question per line
  docusearch README.md
    > Which ports are used?
    > :open other.pdf
    > :remove
    > :quit

  # Show the extracted text (no API key needed)
  docusearch --print-text report.pdf

  # Full session state as JSON
  docusearch --json notes.txt "Summarise the release steps"

  # Another provider through edgequake-llm
  docusearch --provider openai --model gpt-4.1-mini spec.pdf "List the endpoints"

ACCEPTED FILES:
  .pdf, .docx, .txt, .md, .json, .html, .xml (any other type is read as text)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY        Google Gemini API key
  API_KEY               Fallback for GEMINI_API_KEY
  DOCUSEARCH_MODEL      Model ID (default gemini-2.5-flash)
  DOCUSEARCH_PROVIDER   edgequake-llm provider instead of Gemini
  OPENAI_API_KEY, ...   Credentials read by edgequake-llm providers
"#;

/// Ask questions about a document; answers come only from its content.
#[derive(Parser, Debug)]
#[command(
    name = "docusearch",
    version,
    about = "Ask questions about a PDF, DOCX or text document",
    long_about = "Load a PDF, Word (.docx) or plain-text document and ask questions about it. \
Each question is answered by a language model from the document's text only; information \
not present in the document is reported as missing.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to load.
    file: PathBuf,

    /// Question to answer. Without it, questions are read from stdin.
    question: Option<String>,

    /// Declared media type (e.g. application/pdf). Guessed from the extension if unset.
    #[arg(long, env = "DOCUSEARCH_MEDIA_TYPE")]
    media_type: Option<String>,

    /// Print the normalised document text and exit.
    #[arg(long)]
    print_text: bool,

    /// Print the session snapshot as JSON instead of the plain answer.
    #[arg(long, env = "DOCUSEARCH_JSON")]
    json: bool,

    /// Gemini API key. Defaults to GEMINI_API_KEY, then API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "DOCUSEARCH_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider (openai, anthropic, ollama, …). Default: built-in Gemini client.
    #[arg(long, env = "DOCUSEARCH_PROVIDER")]
    provider: Option<String>,

    /// Gemini API base URL.
    #[arg(long, env = "DOCUSEARCH_ENDPOINT")]
    endpoint: Option<String>,

    /// Answer and message language: fr, en.
    #[arg(long, env = "DOCUSEARCH_LANGUAGE", default_value = "fr", value_parser = parse_language)]
    language: Language,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DOCUSEARCH_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens per answer.
    #[arg(long, env = "DOCUSEARCH_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Completion call timeout in seconds.
    #[arg(long, env = "DOCUSEARCH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to a text file replacing the built-in instruction.
    #[arg(long, env = "DOCUSEARCH_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Disable spinners.
    #[arg(long, env = "DOCUSEARCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCUSEARCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and answers.
    #[arg(short, long, env = "DOCUSEARCH_QUIET")]
    quiet: bool,
}

fn parse_language(s: &str) -> std::result::Result<Language, String> {
    Language::from_tag(s).ok_or_else(|| format!("unsupported language '{s}' (use fr or en)"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Spinners replace INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.print_text;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;
    let query = build_query_service(&cli, config)?;
    let mut session = Session::new(query);
    if show_progress {
        session = session.with_observer(CliObserver::new());
    }

    // ── Load the document ────────────────────────────────────────────────
    let file = load_file(&cli.file, cli.media_type.as_deref()).await?;
    session.select_file(file).await;

    if cli.print_text {
        return print_text(&session);
    }

    // ── One-shot or interactive ──────────────────────────────────────────
    match cli.question.as_deref() {
        Some(question) => {
            if session.snapshot().ingest_status == IngestStatus::Failed {
                report(&session, cli.json)?;
                return Ok(ExitCode::FAILURE);
            }
            session.ask(question).await;
            report(&session, cli.json)
        }
        None => {
            interactive(&session, &cli).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Map CLI args to `QueryConfig`.
async fn build_config(cli: &Cli) -> Result<QueryConfig> {
    let env = QueryConfig::from_env();

    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = QueryConfig::builder()
        .model(cli.model.clone().unwrap_or(env.model))
        .language(cli.language)
        .api_timeout_secs(cli.api_timeout);

    if let Some(key) = cli.api_key.clone().or(env.api_key) {
        builder = builder.api_key(key);
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Gemini unless `--provider` names another edgequake-llm provider.
fn build_query_service(cli: &Cli, config: QueryConfig) -> Result<QueryService> {
    match cli.provider.as_deref() {
        Some(name) if !name.is_empty() => {
            let client = ProviderClient::from_factory(name, &config.model)
                .context("Failed to create completion provider")?;
            let client: Arc<dyn CompletionClient> = Arc::new(client);
            Ok(QueryService::with_client(config, client))
        }
        _ => QueryService::new(config).context("Failed to create Gemini client"),
    }
}

async fn load_file(path: &Path, media_type: Option<&str>) -> Result<UploadedFile> {
    let file = match media_type {
        Some(mime) => UploadedFile::from_path_with_type(path, MediaType::from_mime(mime)).await,
        None => UploadedFile::from_path(path).await,
    };
    file.with_context(|| format!("Failed to load {}", path.display()))
}

fn print_text(session: &Session) -> Result<ExitCode> {
    let snapshot = session.snapshot();
    if let Some(error) = snapshot.parse_error {
        eprintln!("{} {}", red("✗"), error.message);
        return Ok(ExitCode::FAILURE);
    }

    let text = session
        .document()
        .map(|d| d.text.to_string())
        .unwrap_or_default();
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the answer (or snapshot) and map the outcome to an exit code.
fn report(session: &Session, json: bool) -> Result<ExitCode> {
    let snapshot = session.snapshot();
    let ok = snapshot.ingest_status != IngestStatus::Failed
        && snapshot.query_status == QueryStatus::Done;

    if json {
        let json =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialise snapshot")?;
        println!("{json}");
    } else if let Some(ref answer) = snapshot.answer {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(answer.as_bytes())
            .context("Failed to write to stdout")?;
        if !answer.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    } else if let Some(error) = snapshot.search_error.or(snapshot.parse_error) {
        eprintln!("{} {}", red("✗"), error.message);
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Read questions and commands from stdin until EOF or `:quit`.
async fn interactive(session: &Session, cli: &Cli) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if !cli.quiet {
            eprint!("{} ", cyan(">"));
            io::stderr().flush().ok();
        }
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":remove" => {
                session.remove_file();
                if !cli.quiet {
                    eprintln!("{}", dim("document removed"));
                }
            }
            _ if line.starts_with(":open ") => {
                let path = PathBuf::from(line.trim_start_matches(":open ").trim());
                match load_file(&path, None).await {
                    Ok(file) => {
                        session.select_file(file).await;
                        if cli.json {
                            report(session, true)?;
                        }
                    }
                    Err(e) => eprintln!("{} {:#}", red("✗"), e),
                }
            }
            question => {
                session.ask(question).await;
                report(session, cli.json)?;
            }
        }
    }
    Ok(())
}
