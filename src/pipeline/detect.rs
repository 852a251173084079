//! Format detection from the declared media type.
//!
//! Unknown types are not rejected: they route to the plain-text parser, which
//! decodes whatever bytes it gets.

use crate::document::MediaType;
use crate::error::DocumentFormat;
use tracing::warn;

/// Pick the parser format for a declared media type.
pub fn detect(media_type: &MediaType) -> DocumentFormat {
    match media_type {
        MediaType::Pdf => DocumentFormat::Pdf,
        MediaType::Docx => DocumentFormat::Docx,
        MediaType::PlainText => DocumentFormat::PlainText,
        MediaType::Unsupported(declared) => {
            warn!(
                "Unrecognised media type '{}', decoding as plain text",
                declared
            );
            DocumentFormat::PlainText
        }
    }
}

/// [`detect`] for a raw MIME string.
pub fn detect_mime(mime: &str) -> DocumentFormat {
    detect(&MediaType::from_mime(mime))
}
