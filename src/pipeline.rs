//! Quiz assembly: chunk the source text, ask the model for a share of the
//! questions per chunk, and merge the replies.
//!
//! Chunks are processed one at a time. Each chunk's allocation depends on how
//! many questions earlier chunks actually produced, so the order matters:
//!
//! - `questions_per_chunk = max(1, num_questions / chunk_count)`
//! - every chunk but the last asks for `min(questions_per_chunk, remaining)`
//! - the last chunk asks for everything still remaining
//! - once `remaining` hits zero no further calls are made
//!
//! The model's count is advisory. The budget is reduced by what it returned,
//! and the merged list is truncated to `num_questions` at the end.

use crate::chunking::chunk_text;
use crate::config::{FailurePolicy, QuizConfig};
use crate::core::LowLevelClient;
use crate::error::{AIError, QuizError};
use crate::interceptors::Interceptor;
use crate::json_utils::parse_quiz_reply;
use crate::prompt::build_prompt;
use crate::quiz::{ChunkOutcome, GenerationReport, QuizResult};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Even share of the questions per chunk, never less than one.
pub fn questions_per_chunk(num_questions: usize, chunk_count: usize) -> usize {
    (num_questions / chunk_count.max(1)).max(1)
}

/// Questions to request from chunk `index` given what is left of the budget.
pub fn chunk_allocation(index: usize, chunk_count: usize, per_chunk: usize, remaining: usize) -> usize {
    let is_last = index + 1 >= chunk_count;
    if is_last { remaining } else { per_chunk.min(remaining) }
}

/// Generates quizzes from source text through a [`LowLevelClient`].
#[derive(Clone)]
pub struct QuizPipeline<C: LowLevelClient> {
    client: C,
    config: QuizConfig,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl<C: LowLevelClient> QuizPipeline<C> {
    pub fn new(client: C, config: QuizConfig) -> Self {
        info!(
            max_chars = config.max_chars,
            max_questions = config.max_questions,
            policy = ?config.failure_policy,
            "Creating new QuizPipeline"
        );
        Self { client, config, interceptor: None }
    }

    /// Record every successful exchange with `interceptor`.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// Generate up to `num_questions` questions from `text`.
    ///
    /// Fewer questions than requested is a valid result when the model
    /// under-produces. Chunk failures are handled per the configured
    /// [`FailurePolicy`].
    pub async fn generate(&self, text: &str, num_questions: usize, difficulty: &str) -> Result<QuizResult, QuizError> {
        Ok(self.generate_detailed(text, num_questions, difficulty).await?.quiz)
    }

    /// Like [`generate`](Self::generate), also returning what happened to each chunk.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn generate_detailed(
        &self,
        text: &str,
        num_questions: usize,
        difficulty: &str,
    ) -> Result<GenerationReport, QuizError> {
        if text.trim().is_empty() {
            return Err(QuizError::EmptyText);
        }
        if num_questions == 0 || num_questions > self.config.max_questions {
            return Err(QuizError::InvalidQuestionCount {
                requested: num_questions,
                max: self.config.max_questions,
            });
        }

        let chunks = chunk_text(text, self.config.max_chars);
        let chunk_count = chunks.len();
        let per_chunk = questions_per_chunk(num_questions, chunk_count);
        info!(chunk_count, per_chunk, num_questions, "Starting quiz generation");

        let mut remaining = num_questions;
        let mut questions = Vec::with_capacity(num_questions);
        let mut outcomes = Vec::with_capacity(chunk_count);

        for (index, chunk) in chunks.iter().enumerate() {
            if remaining == 0 {
                debug!(skipped = chunk_count - index, "Question budget exhausted");
                break;
            }

            let requested = chunk_allocation(index, chunk_count, per_chunk, remaining);
            match self.generate_chunk(index, chunk, requested, difficulty).await {
                Ok(quiz) => {
                    let returned = quiz.len();
                    if returned != requested {
                        debug!(chunk = index, requested, returned, "Model returned a different question count");
                    }
                    for question in quiz.questions.iter().filter(|q| !q.is_well_formed()) {
                        warn!(
                            chunk = index,
                            options = question.options.len(),
                            correct = question.correct_count(),
                            "Generated question is not four options with one correct"
                        );
                    }
                    remaining = remaining.saturating_sub(returned);
                    questions.extend(quiz.questions);
                    outcomes.push(ChunkOutcome { index, requested, returned, error: None });
                }
                Err(err) => match self.config.failure_policy {
                    FailurePolicy::FailFast => {
                        error!(chunk = index, error = %err, "Chunk generation failed, aborting");
                        return Err(err);
                    }
                    FailurePolicy::BestEffort => {
                        warn!(chunk = index, error = %err, "Chunk generation failed, continuing");
                        outcomes.push(ChunkOutcome { index, requested, returned: 0, error: Some(err) });
                    }
                },
            }
        }

        if questions.is_empty() && !outcomes.is_empty() && outcomes.iter().all(|o| !o.is_success()) {
            if let Some(err) = outcomes.into_iter().find_map(|o| o.error) {
                return Err(err);
            }
            return Ok(GenerationReport::default());
        }

        questions.truncate(num_questions);
        info!(
            questions = questions.len(),
            failed_chunks = outcomes.iter().filter(|o| !o.is_success()).count(),
            "Quiz generation completed"
        );

        Ok(GenerationReport { quiz: QuizResult::new(questions), chunks: outcomes })
    }

    /// One chunk's call, retried per the configured [`RetryConfig`](crate::core::RetryConfig).
    async fn generate_chunk(
        &self,
        index: usize,
        chunk: &str,
        requested: usize,
        difficulty: &str,
    ) -> Result<QuizResult, QuizError> {
        let prompt = build_prompt(chunk, requested, difficulty);
        debug!(chunk = index, requested, chunk_len = chunk.len(), "Requesting questions for chunk");

        let mut attempt = 0;
        loop {
            let err = match self.ask_once(index, &prompt).await {
                Ok(quiz) => return Ok(quiz),
                Err(err) => err,
            };

            let allowed = err.retry_kind().map_or(0, |kind| self.config.retry.retries_for(kind));
            if attempt >= allowed {
                return Err(err);
            }
            attempt += 1;
            warn!(chunk = index, attempt, allowed, error = %err, "Retrying chunk");
        }
    }

    async fn ask_once(&self, index: usize, prompt: &str) -> Result<QuizResult, QuizError> {
        let timeout = self.config.request_timeout;
        let raw = match tokio::time::timeout(timeout, self.client.ask_raw(prompt.to_string())).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(source)) => return Err(QuizError::ServiceUnavailable { chunk: index, source }),
            Err(_) => {
                return Err(QuizError::ServiceUnavailable { chunk: index, source: AIError::Timeout(timeout) });
            }
        };

        if let Some(interceptor) = &self.interceptor {
            if let Err(e) = interceptor.save(prompt, &raw).await {
                warn!(error = %e, "Failed to save transcript");
            }
        }

        parse_quiz_reply(&raw).map_err(|source| QuizError::MalformedResponse { chunk: index, source, raw })
    }
}
