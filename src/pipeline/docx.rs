//! Raw-text extraction from Word OOXML (`.docx`) archives.
//!
//! Only `word/document.xml` is read. Text runs are concatenated, run-level
//! tabs and breaks become `\t` / `\n`, and every paragraph ends with a blank
//! line. Table cells contribute their paragraphs in document order with no
//! table structure. Formatting, images, headers and footers are ignored.

use crate::error::{DocumentFormat, ParseError};
use crate::pipeline::DocumentParser;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Raw-text DOCX extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser;

impl DocumentParser for DocxParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| docx_error(format!("not a valid DOCX archive: {e}")))?;

        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| docx_error(format!("missing {DOCUMENT_PART}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| docx_error(format!("unreadable {DOCUMENT_PART}: {e}")))?;

        debug!("{} is {} bytes", DOCUMENT_PART, xml.len());
        extract_raw_text(&xml)
    }
}

/// Walk `document.xml` and collect its raw text.
fn extract_raw_text(xml: &str) -> Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text = false;
    let mut run_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"r" => run_depth += 1,
                b"tab" if run_depth > 0 => text.push('\t'),
                b"br" | b"cr" if run_depth > 0 => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if run_depth > 0 => text.push('\t'),
                b"br" | b"cr" if run_depth > 0 => text.push('\n'),
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let chunk = e
                    .unescape()
                    .map_err(|e| docx_error(format!("malformed {DOCUMENT_PART}: {e}")))?;
                text.push_str(&chunk);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(docx_error(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(text)
}

fn docx_error(message: impl Into<String>) -> ParseError {
    ParseError::new(DocumentFormat::Docx, message)
}
