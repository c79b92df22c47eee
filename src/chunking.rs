//! Paragraph-aligned splitting of source text into bounded chunks.

use tracing::debug;

/// Paragraph boundary in extracted text.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Default chunk bound, in characters.
pub const DEFAULT_MAX_CHARS: usize = 6000;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Text that already fits is returned whole (trimmed). Longer text is split on
/// blank lines and paragraphs are packed greedily; a chunk is closed when the
/// next paragraph plus its separator would push it past the bound. Paragraphs
/// are never split, so one longer than `max_chars` becomes its own chunk.
///
/// Lengths are counted in `char`s, not bytes.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let separator_len = char_len(PARAGRAPH_SEPARATOR);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph_len = char_len(paragraph);

        if !current.is_empty() && current_len + separator_len + paragraph_len > max_chars {
            push_trimmed(&mut chunks, &current);
            current.clear();
            current_len = 0;
        }

        if !current.is_empty() {
            current.push_str(PARAGRAPH_SEPARATOR);
            current_len += separator_len;
        }
        current.push_str(paragraph);
        current_len += paragraph_len;
    }
    push_trimmed(&mut chunks, &current);

    debug!(chunks = chunks.len(), max_chars, "split source text");
    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}
