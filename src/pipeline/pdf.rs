//! PDF text extraction via `lopdf`.
//!
//! The document is loaded once, its page tree resolved, then pages are
//! decoded strictly in ascending page order. Each text-showing operator
//! (`Tj`, `TJ`, `'`, `"`) of a page's content stream yields one token; the
//! page becomes one line of its tokens joined by a single space. Any page
//! that fails to decode fails the whole document; no partial text is returned.

use crate::error::{DocumentFormat, ParseError};
use crate::pipeline::DocumentParser;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use tracing::debug;

/// Page-by-page PDF text extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
        let document = Document::load_mem(bytes)
            .map_err(|e| pdf_error(format!("invalid PDF structure: {e}")))?;

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(pdf_error("document has no pages"));
        }
        debug!("PDF loaded: {} pages", pages.len());

        let mut text = String::new();
        for (&page_number, &page_id) in &pages {
            let raw = document
                .get_page_content(page_id)
                .map_err(|e| pdf_error(format!("page {page_number}: {e}")))?;
            let content = Content::decode(&raw)
                .map_err(|e| pdf_error(format!("page {page_number}: {e}")))?;

            let tokens = page_tokens(&content.operations)
                .map_err(|e| pdf_error(format!("page {page_number}: {e}")))?;
            debug!("Page {}: {} text runs", page_number, tokens.len());

            text.push_str(&tokens.join(" "));
            text.push('\n');
        }

        Ok(text)
    }
}

/// Collect one token per text-showing operator, in content-stream order.
///
/// Text objects must be balanced: a `BT` left open (or an `ET` without one)
/// means the stream was cut short or mangled.
fn page_tokens(operations: &[Operation]) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut open = false;

    for op in operations {
        match op.operator.as_str() {
            "BT" if open => return Err("nested text object".into()),
            "BT" => open = true,
            "ET" if !open => return Err("text object closed without BT".into()),
            "ET" => open = false,
            "Tj" | "'" => push_token(&mut tokens, op.operands.first()),
            "\"" => push_token(&mut tokens, op.operands.get(2)),
            "TJ" => {
                let token: String = match op.operands.first() {
                    Some(Object::Array(items)) => {
                        items.iter().filter_map(string_operand).collect()
                    }
                    _ => String::new(),
                };
                if !token.is_empty() {
                    tokens.push(token);
                }
            }
            _ => {}
        }
    }

    if open {
        return Err("unterminated text object".into());
    }
    Ok(tokens)
}

fn push_token(tokens: &mut Vec<String>, operand: Option<&Object>) {
    if let Some(token) = operand.and_then(string_operand) {
        if !token.is_empty() {
            tokens.push(token);
        }
    }
}

/// Decode a string operand: UTF-16BE when it carries a BOM, single-byte otherwise.
fn string_operand(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        }
        None => Some(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

fn pdf_error(message: impl Into<String>) -> ParseError {
    ParseError::new(DocumentFormat::Pdf, message)
}
