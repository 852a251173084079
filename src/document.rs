//! Value types flowing through the pipeline: the uploaded file, its declared
//! media type, the normalised document and the user's question.

use crate::error::DocuSearchError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// MIME type of a PDF upload.
pub const MIME_PDF: &str = "application/pdf";

/// MIME type of a Word OOXML (`.docx`) upload.
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Non-`text/*` MIME types that are still plain text.
const TEXTUAL_APPLICATION_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/xhtml+xml",
    "application/javascript",
    "application/x-yaml",
    "application/yaml",
    "application/toml",
    "application/x-sh",
];

/// Declared media type of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    Docx,
    PlainText,
    /// Anything else, holding the declared type (empty when none was declared).
    Unsupported(String),
}

impl MediaType {
    /// Classify a declared MIME type. Parameters (`; charset=…`) and case are ignored.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            MIME_PDF => MediaType::Pdf,
            MIME_DOCX => MediaType::Docx,
            t if t.starts_with("text/") => MediaType::PlainText,
            t if TEXTUAL_APPLICATION_TYPES.contains(&t) => MediaType::PlainText,
            _ => MediaType::Unsupported(essence),
        }
    }

    /// Guess the media type from a file extension.
    pub fn from_path(path: &Path) -> Self {
        match mime_guess::from_path(path).first() {
            Some(mime) => Self::from_mime(mime.essence_str()),
            None => MediaType::Unsupported(String::new()),
        }
    }

    /// The MIME type string for this media type.
    pub fn mime(&self) -> &str {
        match self {
            MediaType::Pdf => MIME_PDF,
            MediaType::Docx => MIME_DOCX,
            MediaType::PlainText => "text/plain",
            MediaType::Unsupported(m) => m,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Unsupported(m) if m.is_empty() => f.write_str("<undeclared>"),
            other => f.write_str(other.mime()),
        }
    }
}

/// A file selected by the user. Immutable once created.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: MediaType, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its media type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DocuSearchError> {
        let path = path.as_ref();
        Self::from_path_with_type(path, MediaType::from_path(path)).await
    }

    /// Read a file from disk with an explicitly declared media type.
    pub async fn from_path_with_type(
        path: impl AsRef<Path>,
        media_type: MediaType,
    ) -> Result<Self, DocuSearchError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DocuSearchError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => DocuSearchError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => DocuSearchError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("Read {} ({} bytes, {})", name, bytes.len(), media_type);
        Ok(Self::new(name, media_type, bytes))
    }
}

/// The single plain-text rendition of an uploaded document.
///
/// The text is shared (`Arc<str>`) so a search can hold it without copying
/// while the session keeps its own handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub source_name: String,
    pub text: Arc<str>,
}

impl NormalizedDocument {
    pub fn new(source_name: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        Self {
            source_name: source_name.into(),
            text: text.into(),
        }
    }

    /// Whitespace-only text counts as no document.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// The user's question, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The question as it is sent: surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed().is_empty()
    }
}
