//! Turning uploaded document bytes into source text.

use crate::chunking::char_len;
use crate::error::ExtractError;
use tracing::debug;

/// Extracts plain text from a document.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Treats the document as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(std::str::from_utf8(bytes)?.to_string())
    }
}

/// Extracts the text layer of a PDF.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[cfg(feature = "pdf")]
impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Unreadable(e.to_string()))?;
        // Page breaks become paragraph breaks so chunking never glues pages together
        let text = text.replace('\u{c}', "\n\n");
        debug!(chars = text.len(), "Extracted PDF text");
        Ok(text)
    }
}

/// Reject text too short to build a quiz from.
pub fn ensure_extractable(text: &str, min_chars: usize) -> Result<&str, ExtractError> {
    let trimmed = text.trim();
    let found = char_len(trimmed);
    if found < min_chars || trimmed.is_empty() {
        debug!(found, min_chars, "Extracted text too short");
        return Err(ExtractError::TooShort { found, min: min_chars });
    }
    Ok(trimmed)
}
