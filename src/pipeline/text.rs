//! Plain-text decoding.
//!
//! UTF-8 by default, lossy: invalid sequences become U+FFFD instead of
//! failing. A leading byte-order mark selects UTF-8 or UTF-16 (LE/BE) and is
//! dropped from the output.

use crate::error::{DocumentFormat, ParseError};
use crate::pipeline::DocumentParser;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Byte-to-string decoder. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
        Ok(decode(bytes))
    }
}

fn decode(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        String::from_utf8_lossy(rest).into_owned()
    } else if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        decode_utf16(rest, u16::from_le_bytes)
    } else if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        decode_utf16(rest, u16::from_be_bytes)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = bytes.chunks_exact(2);
    let dangling = !chunks.remainder().is_empty();
    let units: Vec<u16> = chunks.map(|pair| unit([pair[0], pair[1]])).collect();

    let mut text = String::from_utf16_lossy(&units);
    if dangling {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}
