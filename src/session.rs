//! The session: one user, one document, one question at a time.
//!
//! [`Session`] keeps its state behind a short-lived lock. Long work
//! (parsing, the completion call) runs with the lock released; its result is
//! committed only if its [`Generation`] is still current, so a slow parse or
//! a late answer can never overwrite newer state.
//!
//! ```text
//! select_file ─▶ begin_ingest ─▶ IngestionPipeline::ingest ─▶ commit_ingest
//!                 (lock)              (no lock)                 (lock, gen check)
//!
//! search ──────▶ validate + begin ─▶ QueryService::search ───▶ commit
//!                 (lock)              (no lock)                 (lock, gen check)
//! ```

use crate::config::{Language, QueryConfig};
use crate::document::{NormalizedDocument, Query, UploadedFile};
use crate::error::{DocuSearchError, ErrorState, ParseError, SearchError};
use crate::ingest::{Generation, IngestState, IngestStatus, IngestionPipeline};
use crate::progress::{NoopObserver, Observer};
use crate::query::{validate, QueryService, QueryState, QueryStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Whether an operation's result was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Committed,
    /// A newer upload or a removal happened first; the result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Committed,
    Superseded,
}

/// Everything the session knows. Read from outside through [`SessionSnapshot`].
#[derive(Debug, Default)]
struct SessionState {
    ingest: IngestState,
    query: QueryState,
    question: Query,
}

/// Serialisable read model of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub file_name: Option<String>,
    pub ingest_status: IngestStatus,
    pub query_status: QueryStatus,
    /// Characters in the loaded document; `None` when nothing is loaded.
    pub char_count: Option<usize>,
    pub question: String,
    pub answer: Option<String>,
    pub parse_error: Option<ErrorState>,
    pub search_error: Option<ErrorState>,
}

pub struct Session {
    state: Mutex<SessionState>,
    pipeline: IngestionPipeline,
    query: QueryService,
    observer: Observer,
}

impl Session {
    pub fn new(query: QueryService) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            pipeline: IngestionPipeline::new(),
            query,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build a session with the Gemini client configured from `config`.
    pub fn from_config(config: QueryConfig) -> Result<Self, DocuSearchError> {
        Ok(Self::new(QueryService::new(config)?))
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn language(&self) -> Language {
        self.query.config().language
    }

    /// Select `file` as the current document and parse it.
    ///
    /// Any previous document, error and answer are cleared immediately.
    pub async fn select_file(&self, file: UploadedFile) -> IngestOutcome {
        let name = file.name.clone();
        let generation = self.begin_ingest(&name);
        let result = self.pipeline.ingest(file).await;
        self.commit_ingest(generation, &name, result)
    }

    /// First half of [`Session::select_file`]: enter `Parsing` and return the
    /// generation the parse result must carry.
    pub fn begin_ingest(&self, file_name: &str) -> Generation {
        let generation = {
            let mut state = self.state.lock();
            state.query.clear();
            state.ingest.begin(file_name)
        };
        info!("Upload {} started (generation {})", file_name, generation.value());
        self.observer.on_ingest_start(file_name);
        generation
    }

    /// Second half of [`Session::select_file`]: store a parse result if
    /// `generation` is still current.
    pub fn commit_ingest(
        &self,
        generation: Generation,
        file_name: &str,
        result: Result<NormalizedDocument, ParseError>,
    ) -> IngestOutcome {
        let language = self.language();
        let event = match &result {
            Ok(document) => Ok(document.char_count()),
            Err(err) => Err(ErrorState::from_parse(err, language)),
        };

        let committed = self.state.lock().ingest.commit(generation, result);
        if !committed {
            warn!(
                "Discarding stale parse of {} (generation {})",
                file_name,
                generation.value()
            );
            self.observer.on_ingest_superseded(file_name);
            return IngestOutcome::Superseded;
        }

        match event {
            Ok(char_count) => self.observer.on_ingest_complete(file_name, char_count),
            Err(error) => {
                warn!("Upload {} failed: {}", file_name, error.message);
                self.observer.on_ingest_error(file_name, &error);
            }
        }
        IngestOutcome::Committed
    }

    /// Drop the document and every result derived from it.
    pub fn remove_file(&self) {
        let mut state = self.state.lock();
        state.ingest.clear();
        state.query.clear();
        info!("Document removed");
    }

    pub fn set_query(&self, text: impl Into<String>) {
        self.state.lock().question = Query::new(text);
    }

    /// Set the question and search.
    pub async fn ask(&self, question: impl Into<String>) -> SearchOutcome {
        self.set_query(question);
        self.search().await
    }

    /// Search the current document for the current question.
    ///
    /// Validation failures are committed synchronously as `Failed` without
    /// contacting the endpoint.
    pub async fn search(&self) -> SearchOutcome {
        let language = self.language();

        let (document, question, generation) = {
            let mut state = self.state.lock();
            let document = state.ingest.document().cloned();
            let question = state.question.clone();
            if let Err(error) = validate(document.as_ref(), &question) {
                state.query.fail_validation(error);
                drop(state);
                self.observer
                    .on_search_error(&ErrorState::from_search(&SearchError::from(error), language));
                return SearchOutcome::Committed;
            }
            let generation = state.query.begin();
            (document, question, generation)
        };

        self.observer.on_search_start(question.trimmed());
        let result = self.query.search(document.as_ref(), &question).await;
        let event = match &result {
            Ok(answer) => Ok(answer.text.len()),
            Err(err) => Err(ErrorState::from_search(err, language)),
        };

        let committed = self.state.lock().query.commit(generation, result);
        if !committed {
            warn!("Discarding stale answer (generation {})", generation.value());
            self.observer.on_search_superseded();
            return SearchOutcome::Superseded;
        }

        match event {
            Ok(len) => self.observer.on_search_complete(len),
            Err(error) => {
                warn!("Search failed: {}", error.message);
                self.observer.on_search_error(&error);
            }
        }
        SearchOutcome::Committed
    }

    /// The loaded document, if any.
    pub fn document(&self) -> Option<NormalizedDocument> {
        self.state.lock().ingest.document().cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let language = self.language();
        let state = self.state.lock();
        SessionSnapshot {
            file_name: state.ingest.file_name().map(str::to_string),
            ingest_status: state.ingest.status(),
            query_status: state.query.status(),
            char_count: state.ingest.document().map(NormalizedDocument::char_count),
            question: state.question.text.clone(),
            answer: state.query.answer().map(|a| a.text.clone()),
            parse_error: state
                .ingest
                .error()
                .map(|e| ErrorState::from_parse(e, language)),
            search_error: state
                .query
                .error()
                .map(|e| ErrorState::from_search(e, language)),
        }
    }
}
