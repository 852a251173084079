//! Ingestion: turn an [`UploadedFile`] into a [`NormalizedDocument`].
//!
//! [`IngestionPipeline`] is stateless and runs detect → parse → normalise.
//! [`IngestState`] is the upload state machine the session owns:
//!
//! ```text
//!            begin                 commit(Ok)
//!   Idle ───────────▶ Parsing ─────────────────▶ Ready
//!    ▲                  │  ▲                       │
//!    │ clear            │  │ begin (any state)     │
//!    │                  ▼  │                       │
//!    └──────────────── Failed ◀────────────────────┘
//!                     commit(Err)
//! ```
//!
//! Every `begin` hands out a new [`Generation`]; `commit` ignores results
//! carrying an older one.

use crate::document::{NormalizedDocument, UploadedFile};
use crate::error::{DocumentFormat, ParseError};
use crate::pipeline::{detect, normalize_text, parser_for};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Monotonically increasing marker of the current operation of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Upload lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IngestStatus {
    #[default]
    Idle,
    Parsing,
    Ready,
    Failed,
}

/// Detect → parse → normalise.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestionPipeline;

impl IngestionPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Parse `file` on the blocking pool.
    ///
    /// The file's bytes are moved into the parsing task and dropped when it
    /// ends. A parser panic is reported as a [`ParseError`] for the detected
    /// format.
    pub async fn ingest(&self, file: UploadedFile) -> Result<NormalizedDocument, ParseError> {
        let format = detect(&file.media_type);
        let UploadedFile { name, bytes, .. } = file;
        info!("Parsing {} as {} ({} bytes)", name, format, bytes.len());

        let start = Instant::now();
        let text = tokio::task::spawn_blocking(move || parse_and_normalize(format, &bytes))
            .await
            .map_err(|e| ParseError::new(format, format!("parser task failed: {e}")))??;

        let document = NormalizedDocument::new(name, text);
        if document.is_empty() {
            warn!(
                "{} produced no text (image-only or empty document?)",
                document.source_name
            );
        }
        info!(
            "Parsed {}: {} chars in {}ms",
            document.source_name,
            document.char_count(),
            start.elapsed().as_millis()
        );
        Ok(document)
    }
}

fn parse_and_normalize(format: DocumentFormat, bytes: &[u8]) -> Result<String, ParseError> {
    let raw = parser_for(format).parse(bytes)?;
    debug!("{} parser produced {} bytes", format, raw.len());
    Ok(normalize_text(&raw))
}

/// The upload state machine.
#[derive(Debug, Clone, Default)]
pub struct IngestState {
    status: IngestStatus,
    generation: Generation,
    file_name: Option<String>,
    document: Option<NormalizedDocument>,
    error: Option<ParseError>,
}

impl IngestState {
    /// A new file was selected: drop the previous document and error, enter
    /// `Parsing`, and return the generation the result must carry.
    pub fn begin(&mut self, file_name: impl Into<String>) -> Generation {
        self.generation = self.generation.next();
        self.status = IngestStatus::Parsing;
        self.file_name = Some(file_name.into());
        self.document = None;
        self.error = None;
        self.generation
    }

    /// Store a parse result. Returns `false` (and changes nothing) when
    /// `generation` is no longer current.
    pub fn commit(
        &mut self,
        generation: Generation,
        result: Result<NormalizedDocument, ParseError>,
    ) -> bool {
        if generation != self.generation || self.status != IngestStatus::Parsing {
            return false;
        }
        match result {
            Ok(document) => {
                self.status = IngestStatus::Ready;
                self.document = Some(document);
            }
            Err(error) => {
                self.status = IngestStatus::Failed;
                self.error = Some(error);
            }
        }
        true
    }

    /// The file was removed: back to `Idle`, and any in-flight parse is stale.
    pub fn clear(&mut self) {
        self.generation = self.generation.next();
        self.status = IngestStatus::Idle;
        self.file_name = None;
        self.document = None;
        self.error = None;
    }

    pub fn status(&self) -> IngestStatus {
        self.status
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The committed document, if it has any text.
    pub fn document(&self) -> Option<&NormalizedDocument> {
        self.document.as_ref().filter(|d| !d.is_empty())
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MediaType;

    fn doc(name: &str, text: &str) -> NormalizedDocument {
        NormalizedDocument::new(name, text)
    }

    #[test]
    fn generation_increases() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next(), Generation(1));
    }

    #[test]
    fn begin_then_commit_ok() {
        let mut s = IngestState::default();
        let g = s.begin("a.txt");
        assert_eq!(s.status(), IngestStatus::Parsing);
        assert!(s.commit(g, Ok(doc("a.txt", "hello"))));
        assert_eq!(s.status(), IngestStatus::Ready);
        assert_eq!(&*s.document().unwrap().text, "hello");
    }

    #[test]
    fn begin_then_commit_err() {
        let mut s = IngestState::default();
        let g = s.begin("a.pdf");
        assert!(s.commit(g, Err(ParseError::new(DocumentFormat::Pdf, "bad"))));
        assert_eq!(s.status(), IngestStatus::Failed);
        assert!(s.document().is_none());
        assert_eq!(s.error().unwrap().format, DocumentFormat::Pdf);
    }

    #[test]
    fn stale_commit_is_discarded() {
        let mut s = IngestState::default();
        let first = s.begin("first.pdf");
        let second = s.begin("second.txt");
        assert!(s.commit(second, Ok(doc("second.txt", "two"))));
        assert!(!s.commit(first, Ok(doc("first.pdf", "one"))));
        assert_eq!(s.document().unwrap().source_name, "second.txt");
        assert_eq!(s.file_name(), Some("second.txt"));
    }

    #[test]
    fn commit_after_clear_is_discarded() {
        let mut s = IngestState::default();
        let g = s.begin("a.txt");
        s.clear();
        assert!(!s.commit(g, Ok(doc("a.txt", "x"))));
        assert_eq!(s.status(), IngestStatus::Idle);
        assert!(s.document().is_none());
    }

    #[test]
    fn begin_clears_previous_error() {
        let mut s = IngestState::default();
        let g = s.begin("a.docx");
        s.commit(g, Err(ParseError::new(DocumentFormat::Docx, "zip")));
        s.begin("b.txt");
        assert!(s.error().is_none());
        assert_eq!(s.status(), IngestStatus::Parsing);
    }

    #[test]
    fn blank_document_counts_as_none() {
        let mut s = IngestState::default();
        let g = s.begin("blank.txt");
        s.commit(g, Ok(doc("blank.txt", "   \n")));
        assert_eq!(s.status(), IngestStatus::Ready);
        assert!(s.document().is_none());
    }

    #[tokio::test]
    async fn ingest_plain_text_normalises() {
        let file = UploadedFile::new(
            "notes.txt",
            MediaType::PlainText,
            "a  \r\nb".as_bytes().to_vec(),
        );
        let doc = IngestionPipeline::new().ingest(file).await.unwrap();
        assert_eq!(&*doc.text, "a\nb");
        assert_eq!(doc.source_name, "notes.txt");
    }

    #[tokio::test]
    async fn ingest_unknown_type_decodes_as_text() {
        let file = UploadedFile::new(
            "data.bin",
            MediaType::Unsupported("application/octet-stream".into()),
            b"raw words".to_vec(),
        );
        let doc = IngestionPipeline::new().ingest(file).await.unwrap();
        assert_eq!(&*doc.text, "raw words");
    }

    #[tokio::test]
    async fn ingest_corrupt_pdf_is_typed() {
        let file = UploadedFile::new("bad.pdf", MediaType::Pdf, b"not a pdf".to_vec());
        let err = IngestionPipeline::new().ingest(file).await.unwrap_err();
        assert_eq!(err.format, DocumentFormat::Pdf);
    }
}
