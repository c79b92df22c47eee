//! Tolerant unwrapping of model replies into quiz JSON.
//!
//! Models are told to reply with bare JSON but regularly wrap it in a fenced
//! code block or add a sentence around it. [`parse_quiz_reply`] strips fences,
//! tries a strict parse, and only then falls back to scanning the text for a
//! balanced JSON object carrying a `questions` field.

use crate::quiz::QuizResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

/// Type of a JSON node found by the structure scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }

    /// The slice of `text` this node spans.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all root JSON object/array structures in the given text. Coordinates are byte indices.
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let bytes = text.as_bytes();
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() }),
            b'[' => stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() }),
            b'}' | b']' => {
                let kind = if b == b'}' { NodeType::Object } else { NodeType::Array };
                if let Some(frame) = stack.pop() {
                    // Mismatched closers drop the frame
                    if frame.kind == kind {
                        let node = ObjCoords::new(frame.start, i, kind, frame.children);
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(node);
                        } else {
                            results.push(node);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    trace!(count = results.len(), "found root structures");
    results
}

/// Remove a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
///
/// Text that does not start with a fence is returned trimmed and otherwise unchanged.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Language tag runs to the end of the opening line
    let body = match rest.find('\n') {
        Some(newline) if is_language_tag(&rest[..newline]) => &rest[newline + 1..],
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };

    let body = match body.rfind("```") {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim()
}

fn is_language_tag(line: &str) -> bool {
    line.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse a model reply into a [`QuizResult`].
///
/// Returns the strict-parse error when neither the stripped reply nor any
/// embedded object could be read as a quiz.
#[instrument(skip(raw), fields(raw_len = raw.len()))]
pub fn parse_quiz_reply(raw: &str) -> Result<QuizResult, serde_json::Error> {
    let stripped = strip_code_fence(raw);

    let strict_err = match serde_json::from_str::<QuizResult>(stripped) {
        Ok(quiz) => return Ok(quiz),
        Err(e) => e,
    };

    debug!(error = %strict_err, "strict parse failed, scanning for embedded quiz object");
    for coords in find_json_structures(stripped) {
        if coords.kind != NodeType::Object {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(coords.slice(stripped)) else {
            continue;
        };
        if value.get("questions").is_some() {
            return serde_json::from_value(value);
        }
    }

    Err(strict_err)
}
