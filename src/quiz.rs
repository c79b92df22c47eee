//! Quiz data model shared by the pipeline, the prompt, and callers.
//!
//! The same shapes are used for the model's reply and for the final result, so
//! a `QuizResult` serializes to exactly what the generation service is asked to
//! return.

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

/// Number of options every question is expected to carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// One answer option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "One answer option")]
pub struct OptionSpec {
    /// Option text shown to the learner
    pub text: String,
    /// True for the single correct option
    pub is_correct: bool,
    /// Why this option is correct, or which misconception makes it wrong
    pub explanation: String,
}

/// One generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "A multiple choice question with exactly four options")]
pub struct QuestionSpec {
    pub question: String,
    /// One-sentence summary of the concept being tested
    pub concept_summary: String,
    pub options: Vec<OptionSpec>,
}

impl QuestionSpec {
    pub fn correct_count(&self) -> usize {
        self.options.iter().filter(|o| o.is_correct).count()
    }

    /// Four options, exactly one of them correct.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTIONS_PER_QUESTION && self.correct_count() == 1
    }
}

/// Ordered set of generated questions.
///
/// Also the shape the model must reply with; a reply without a `questions`
/// field is read as an empty quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Quiz", description = "Generated multiple choice questions")]
pub struct QuizResult {
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
}

impl QuizResult {
    pub fn new(questions: Vec<QuestionSpec>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Pretty-printed JSON schema of the reply format.
    pub fn schema_json() -> String {
        let schema = schema_for!(QuizResult);
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|_| "Schema serialization failed".to_string())
    }
}

/// What happened to a single chunk's generation call.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub requested: usize,
    pub returned: usize,
    pub error: Option<crate::error::QuizError>,
}

impl ChunkOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A quiz together with the per-chunk record of how it was produced.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub quiz: QuizResult,
    pub chunks: Vec<ChunkOutcome>,
}

impl GenerationReport {
    pub fn failures(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.chunks.iter().filter(|c| !c.is_success())
    }

    pub fn is_partial(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Total questions asked of the generation service across all chunks.
    pub fn total_requested(&self) -> usize {
        self.chunks.iter().map(|c| c.requested).sum()
    }
}
