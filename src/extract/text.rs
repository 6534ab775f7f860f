//! Plain-text extraction with an encoding ladder.
//!
//! UTF-8 first, UTF-16 when a BOM says so, then latin-1, which maps every
//! byte to a character and therefore terminates the ladder. Output is
//! capped at `TEXT_CHAR_CAP` characters so a stray log dump cannot bloat
//! the content table.

use std::path::Path;

use crate::extract::{ExtractError, ExtractedContent, ExtractionMethod, TextEncoding};

pub const TEXT_CHAR_CAP: usize = 100_000;

pub fn extract(path: &Path) -> Result<ExtractedContent, ExtractError> {
    let bytes = std::fs::read(path)?;
    let (decoded, encoding) = decode(&bytes);
    let text: String = decoded.chars().take(TEXT_CHAR_CAP).collect();
    Ok(ExtractedContent {
        text,
        method: ExtractionMethod::Text(encoding),
    })
}

fn decode(bytes: &[u8]) -> (String, TextEncoding) {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return (s.to_string(), TextEncoding::Utf8);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        let encoding = if bytes[0] == 0xFF {
            encoding_rs::UTF_16LE
        } else {
            encoding_rs::UTF_16BE
        };
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return (decoded.into_owned(), TextEncoding::Utf16);
        }
    }
    // Latin-1 is byte-for-byte U+0000..U+00FF. encoding_rs has no true
    // latin-1 table (its latin-1 label aliases windows-1252), so the map
    // is spelled out here.
    (
        bytes.iter().map(|&b| char::from(b)).collect(),
        TextEncoding::Latin1,
    )
}
