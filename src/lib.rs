//! # docusearch
//!
//! Ask questions about a single technical document and get answers grounded
//! only in that document.
//!
//! A PDF, Word (`.docx`) or plain-text file is reduced to one normalised text,
//! then each question is sent together with the full text to a completion
//! endpoint (Gemini by default) under an instruction that forbids outside
//! knowledge. There is no chunking, no embedding and no retrieval index: the
//! whole document is the context.
//!
//! ## Pipeline Overview
//!
//! ```text
//! UploadedFile
//!  │
//!  ├─ 1. Detect     declared media type → PDF / DOCX / text
//!  ├─ 2. Parse      lopdf / zip + quick-xml / UTF-8 decode (spawn_blocking)
//!  ├─ 3. Normalise  line endings, invisible chars, blank-line runs
//!  │
//! NormalizedDocument + Query
//!  │
//!  ├─ 4. Validate   document present, question non-blank
//!  ├─ 5. Complete   one request: instruction + document + question
//!  └─ 6. Answer     response text, verbatim
//! ```
//!
//! [`Session`] ties both halves together and discards results from uploads
//! or searches that were superseded while in flight.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docusearch::{QueryConfig, Session, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential from GEMINI_API_KEY or API_KEY
//!     let session = Session::from_config(QueryConfig::from_env())?;
//!
//!     session.select_file(UploadedFile::from_path("guide.pdf").await?).await;
//!     session.ask("Comment installer le serveur ?").await;
//!
//!     let snapshot = session.snapshot();
//!     match (snapshot.answer, snapshot.search_error) {
//!         (Some(answer), _) => println!("{answer}"),
//!         (_, Some(error)) => eprintln!("{}", error.message),
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docusearch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docusearch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod completion;
pub mod config;
pub mod document;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod query;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use completion::{CompletionClient, CompletionRequest, GeminiClient, ProviderClient};
pub use config::{Language, QueryConfig, QueryConfigBuilder};
pub use document::{MediaType, NormalizedDocument, Query, UploadedFile};
pub use error::{
    ConfigurationError, DocuSearchError, DocumentFormat, ErrorKind, ErrorState, ParseError,
    QueryError, SearchError, ValidationError,
};
pub use ingest::{Generation, IngestState, IngestStatus, IngestionPipeline};
pub use progress::{NoopObserver, SessionObserver};
pub use query::{AnswerResult, QueryOutcome, QueryService, QueryState, QueryStatus};
pub use session::{IngestOutcome, SearchOutcome, Session, SessionSnapshot};
