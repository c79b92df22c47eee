//! Metered quiz generation for one caller identity.
//!
//! A free identity's use is reserved before any work, so concurrent requests
//! cannot overrun the daily limit, and released again when the request fails,
//! so failed requests never use up the allowance.

use crate::core::LowLevelClient;
use crate::error::{ServiceError, UsageError};
use crate::extract::{ensure_extractable, TextExtractor};
use crate::pipeline::QuizPipeline;
use crate::quiz::QuizResult;
use crate::usage::{today, UsageGate, UsageStatus, UsageStore};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// A generated quiz and the caller's quota after it was counted.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub quiz: QuizResult,
    pub usage: UsageStatus,
}

pub struct QuizService<C: LowLevelClient, S: UsageStore> {
    pipeline: QuizPipeline<C>,
    gate: UsageGate<S>,
    extractor: Box<dyn TextExtractor>,
}

impl<C: LowLevelClient, S: UsageStore> QuizService<C, S> {
    pub fn new(pipeline: QuizPipeline<C>, gate: UsageGate<S>, extractor: Box<dyn TextExtractor>) -> Self {
        Self { pipeline, gate, extractor }
    }

    pub fn pipeline(&self) -> &QuizPipeline<C> {
        &self.pipeline
    }

    pub fn gate(&self) -> &UsageGate<S> {
        &self.gate
    }

    #[instrument(skip(self, document), fields(document_len = document.len()))]
    pub async fn generate_for(
        &self,
        identity: &str,
        document: &[u8],
        num_questions: usize,
        difficulty: &str,
    ) -> Result<QuizResponse, ServiceError> {
        let day = today();
        let usage = self.gate.reserve_on(identity, day).await?;

        match self.produce(document, num_questions, difficulty).await {
            Ok(quiz) => {
                info!(questions = quiz.len(), remaining = ?usage.remaining, "Served quiz");
                Ok(QuizResponse { quiz, usage })
            }
            Err(err) => {
                if !usage.is_pro {
                    if let Err(release_err) = self.gate.release_on(identity, day).await {
                        warn!(error = %release_err, "Failed to release reserved generation");
                    }
                }
                Err(err)
            }
        }
    }

    async fn produce(&self, document: &[u8], num_questions: usize, difficulty: &str) -> Result<QuizResult, ServiceError> {
        let extracted = self.extractor.extract(document)?;
        let text = ensure_extractable(&extracted, self.pipeline.config().min_text_chars)?;
        Ok(self.pipeline.generate(text, num_questions, difficulty).await?)
    }

    pub async fn usage_status(&self, identity: &str) -> Result<UsageStatus, UsageError> {
        self.gate.check(identity).await
    }

    pub async fn upgrade(&self, identity: &str) -> Result<(), UsageError> {
        self.gate.upgrade(identity).await
    }
}
