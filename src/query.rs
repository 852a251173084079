//! The query path: validate, build the request, call the endpoint once.
//!
//! ```text
//!            begin             commit(Ok)
//!   Idle ──────────▶ Searching ───────────▶ Done
//!    ▲   ▲              │
//!    │   │              └── commit(Err) ──▶ Failed
//!    │   └──────── fail_validation ───────▶ Failed
//!    └── clear (from any state)
//! ```
//!
//! Validation failures never reach `Searching` and never call out.

use crate::completion::{CompletionClient, CompletionRequest, GeminiClient};
use crate::config::QueryConfig;
use crate::document::{NormalizedDocument, Query};
use crate::error::{ConfigurationError, DocuSearchError, SearchError, ValidationError};
use crate::ingest::Generation;
use crate::prompts::{build_context, system_instruction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A successful answer, exactly as the endpoint returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub text: String,
}

/// Query lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryStatus {
    #[default]
    Idle,
    Searching,
    Done,
    Failed,
}

/// Orchestrates one search against a [`CompletionClient`].
pub struct QueryService {
    config: QueryConfig,
    client: Option<Arc<dyn CompletionClient>>,
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("config", &self.config)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

impl QueryService {
    /// Use the Gemini client when `config` carries a credential.
    ///
    /// Without one the service is still built; every search then fails with
    /// a [`ConfigurationError`].
    pub fn new(config: QueryConfig) -> Result<Self, DocuSearchError> {
        let client: Option<Arc<dyn CompletionClient>> = if config.has_api_key() {
            Some(Arc::new(GeminiClient::new(&config)?))
        } else {
            warn!("No API key configured; searches will fail until one is set");
            None
        };
        Ok(Self { config, client })
    }

    /// Use an injected client (another provider, or a test double).
    pub fn with_client(config: QueryConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            config,
            client: Some(client),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Answer `question` from `document`.
    ///
    /// Check order: document present, question non-blank, client configured.
    /// Only then is exactly one request sent. The answer text is returned
    /// without post-processing.
    pub async fn search(
        &self,
        document: Option<&NormalizedDocument>,
        question: &Query,
    ) -> Result<AnswerResult, SearchError> {
        let request = self.prepare(document, question)?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(ConfigurationError::missing_api_key)?;

        info!(
            "Searching with {}/{} ({} context bytes)",
            client.name(),
            client.model(),
            request.prompt.len()
        );
        let start = Instant::now();
        let text = client.complete(&request).await?;
        debug!("Answer received in {}ms", start.elapsed().as_millis());

        Ok(AnswerResult { text })
    }

    /// Validate inputs and build the request. No I/O.
    pub fn prepare(
        &self,
        document: Option<&NormalizedDocument>,
        question: &Query,
    ) -> Result<CompletionRequest, SearchError> {
        let document = validate(document, question)?;
        let system = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| system_instruction(self.config.language).to_string());

        Ok(CompletionRequest {
            system,
            prompt: build_context(&document.text, question.trimmed(), self.config.language),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        })
    }
}

/// The document and question a search needs, or why it cannot run.
pub fn validate<'a>(
    document: Option<&'a NormalizedDocument>,
    question: &Query,
) -> Result<&'a NormalizedDocument, ValidationError> {
    let document = document
        .filter(|d| !d.is_empty())
        .ok_or(ValidationError::MissingDocument)?;
    if question.is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    Ok(document)
}

/// Terminal result of the current search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answer(AnswerResult),
    Error(SearchError),
}

/// The query state machine.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    status: QueryStatus,
    generation: Generation,
    outcome: Option<QueryOutcome>,
}

impl QueryState {
    /// A search was submitted with valid inputs: clear the previous outcome,
    /// enter `Searching`, and return the generation the result must carry.
    pub fn begin(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.status = QueryStatus::Searching;
        self.outcome = None;
        self.generation
    }

    /// Store a search result. Returns `false` when `generation` is stale.
    pub fn commit(
        &mut self,
        generation: Generation,
        result: Result<AnswerResult, SearchError>,
    ) -> bool {
        if generation != self.generation || self.status != QueryStatus::Searching {
            return false;
        }
        match result {
            Ok(answer) => {
                self.status = QueryStatus::Done;
                self.outcome = Some(QueryOutcome::Answer(answer));
            }
            Err(error) => {
                self.status = QueryStatus::Failed;
                self.outcome = Some(QueryOutcome::Error(error));
            }
        }
        true
    }

    /// A search was rejected locally. Supersedes any in-flight search.
    pub fn fail_validation(&mut self, error: ValidationError) {
        self.generation = self.generation.next();
        self.status = QueryStatus::Failed;
        self.outcome = Some(QueryOutcome::Error(error.into()));
    }

    /// Back to `Idle`; any in-flight search becomes stale.
    pub fn clear(&mut self) {
        self.generation = self.generation.next();
        self.status = QueryStatus::Idle;
        self.outcome = None;
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn answer(&self) -> Option<&AnswerResult> {
        match &self.outcome {
            Some(QueryOutcome::Answer(a)) => Some(a),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SearchError> {
        match &self.outcome {
            Some(QueryOutcome::Error(e)) => Some(e),
            _ => None,
        }
    }
}
