//! Ingestion stages: raw bytes in, normalised text out.
//!
//! ```text
//! UploadedFile ──▶ detect ──▶ pdf | docx | text ──▶ normalize ──▶ NormalizedDocument
//!  (media type)    (format)     (DocumentParser)     (cleanup)
//! ```
//!
//! 1. [`detect`]: map the declared media type to a [`DocumentFormat`]
//! 2. [`pdf`], [`docx`], [`text`]: one [`DocumentParser`] per format
//! 3. [`normalize`]: deterministic whitespace/invisible-character cleanup
//!
//! Parsers are synchronous and CPU-bound; [`crate::ingest::IngestionPipeline`]
//! runs them on the blocking pool.

pub mod detect;
pub mod docx;
pub mod normalize;
pub mod pdf;
pub mod text;

use crate::error::{DocumentFormat, ParseError};

pub use detect::{detect, detect_mime};
pub use docx::DocxParser;
pub use normalize::normalize_text;
pub use pdf::PdfParser;
pub use text::PlainTextParser;

/// Converts the raw bytes of one format into a single text string.
///
/// Implementations never panic on malformed input they can detect; every
/// format-specific failure comes back as a [`ParseError`] tagged with
/// [`DocumentParser::format`].
pub trait DocumentParser: Send + Sync {
    fn format(&self) -> DocumentFormat;

    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError>;
}

/// The parser registered for `format`.
pub fn parser_for(format: DocumentFormat) -> &'static dyn DocumentParser {
    match format {
        DocumentFormat::Pdf => &PdfParser,
        DocumentFormat::Docx => &DocxParser,
        DocumentFormat::PlainText => &PlainTextParser,
    }
}
