//! Error types for the docusearch library.
//!
//! Each component boundary converts its failures into one of the typed errors
//! below before anything reaches the session:
//!
//! * [`ParseError`]: a parser could not turn the uploaded bytes into text.
//!   Recoverable: the user removes the file and tries another.
//! * [`SearchError`]: the query path failed, either locally
//!   ([`ValidationError`], [`ConfigurationError`]) or remotely ([`QueryError`]).
//! * [`DocuSearchError`]: failures outside the core (reading the file from
//!   disk, building an invalid configuration). Returned by the `*_from_path`
//!   helpers and the config builder only.
//!
//! [`ErrorState`] is the presentation-facing record: an [`ErrorKind`] plus a
//! message in the configured display [`Language`].

use crate::config::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The closed set of formats a parser exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => f.write_str("PDF"),
            DocumentFormat::Docx => f.write_str("DOCX"),
            DocumentFormat::PlainText => f.write_str("text"),
        }
    }
}

/// A parser failed to decode the uploaded bytes.
///
/// Always tagged with the format that was being parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Failed to parse {format} document: {message}")]
pub struct ParseError {
    pub format: DocumentFormat,
    pub message: String,
}

impl ParseError {
    pub fn new(format: DocumentFormat, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }

    /// Message shown to the user, in `language`.
    pub fn user_message(&self, language: Language) -> &'static str {
        match (self.format, language) {
            (DocumentFormat::Pdf, Language::French) => {
                "Impossible de lire le fichier PDF. Il est peut-être corrompu."
            }
            (DocumentFormat::Pdf, Language::English) => {
                "Unable to read the PDF file. It may be corrupted."
            }
            (DocumentFormat::Docx, Language::French) => "Impossible de lire le fichier DOCX.",
            (DocumentFormat::Docx, Language::English) => "Unable to read the DOCX file.",
            (DocumentFormat::PlainText, Language::French) => {
                "Une erreur inattendue est survenue lors du traitement du fichier."
            }
            (DocumentFormat::PlainText, Language::English) => {
                "An unexpected error occurred while processing the file."
            }
        }
    }
}

/// A search was requested without the inputs it needs. Never sent externally.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("No document is loaded; upload a document before searching")]
    MissingDocument,

    #[error("The question is empty; type a question before searching")]
    EmptyQuestion,
}

/// A required setting for the completion service is absent.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Missing configuration: {setting} is not set.\n{hint}")]
pub struct ConfigurationError {
    pub setting: String,
    pub hint: String,
}

impl ConfigurationError {
    pub fn missing_api_key() -> Self {
        Self {
            setting: "GEMINI_API_KEY".to_string(),
            hint: "Export GEMINI_API_KEY (or API_KEY) or pass --api-key.".to_string(),
        }
    }
}

/// The external completion call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryError {
    /// Network failure, timeout, rate limiting or a 5xx from the service.
    #[error("Completion service unavailable: {detail}")]
    ServiceUnavailable { detail: String },

    /// The service rejected the credential (401/403, invalid API key).
    #[error("Completion service rejected the credential: {detail}")]
    InvalidCredentials { detail: String },

    /// Anything else: malformed response, blocked prompt, unexpected status.
    #[error("Completion service error: {detail}")]
    Unclassified { detail: String },
}

impl QueryError {
    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        QueryError::ServiceUnavailable {
            detail: detail.into(),
        }
    }

    pub fn invalid_credentials(detail: impl Into<String>) -> Self {
        QueryError::InvalidCredentials {
            detail: detail.into(),
        }
    }

    pub fn unclassified(detail: impl Into<String>) -> Self {
        QueryError::Unclassified {
            detail: detail.into(),
        }
    }
}

/// Everything [`crate::query::QueryService::search`] can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Validation(_) => ErrorKind::Validation,
            SearchError::Configuration(_) => ErrorKind::Configuration,
            SearchError::Query(QueryError::ServiceUnavailable { .. }) => {
                ErrorKind::ServiceUnavailable
            }
            SearchError::Query(QueryError::InvalidCredentials { .. }) => {
                ErrorKind::InvalidCredentials
            }
            SearchError::Query(QueryError::Unclassified { .. }) => ErrorKind::Unclassified,
        }
    }

    /// Message shown to the user, in `language`.
    ///
    /// Configuration errors name the missing setting; every other kind maps to
    /// a fixed sentence.
    pub fn user_message(&self, language: Language) -> String {
        match (self, language) {
            (SearchError::Validation(_), Language::French) => {
                "Veuillez télécharger un document et poser une question.".to_string()
            }
            (SearchError::Validation(_), Language::English) => {
                "Please upload a document and ask a question.".to_string()
            }
            (SearchError::Configuration(c), Language::French) => format!(
                "Le service de recherche n'est pas configuré : {} n'est pas défini.",
                c.setting
            ),
            (SearchError::Configuration(c), Language::English) => format!(
                "The search service is not configured: {} is not set.",
                c.setting
            ),
            (SearchError::Query(QueryError::InvalidCredentials { .. }), Language::French) => {
                "La clé API a été refusée par le service. Vérifiez votre configuration.".to_string()
            }
            (SearchError::Query(QueryError::InvalidCredentials { .. }), Language::English) => {
                "The API key was rejected by the service. Check your configuration.".to_string()
            }
            (SearchError::Query(_), Language::French) => {
                "Une erreur s'est produite lors de la communication avec l'API. Veuillez réessayer."
                    .to_string()
            }
            (SearchError::Query(_), Language::English) => {
                "An error occurred while communicating with the API. Please try again.".to_string()
            }
        }
    }
}

/// Discriminant of every error the presentation layer can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Parse(DocumentFormat),
    Validation,
    Configuration,
    ServiceUnavailable,
    InvalidCredentials,
    Unclassified,
}

/// What the presentation layer displays for a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorState {
    pub fn from_parse(err: &ParseError, language: Language) -> Self {
        Self {
            kind: ErrorKind::Parse(err.format),
            message: err.user_message(language).to_string(),
        }
    }

    pub fn from_search(err: &SearchError, language: Language) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(language),
        }
    }
}

/// Fatal errors from outside the core: file access and configuration.
#[derive(Debug, Error)]
pub enum DocuSearchError {
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Completion provider '{provider}' could not be created.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },
}
