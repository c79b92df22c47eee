
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::test_utils::{mock_pipeline, paragraphs, quiz_json, quiz_json_from, requested_count, study_text, success};
use studyquiz::clients::MockResponse;
use studyquiz::core::RetryConfig;
use studyquiz::interceptors::{FileInterceptor, Interceptor};
use studyquiz::{AIError, FailurePolicy, QuizConfig, QuizError};

#[tokio::test]
async fn short_text_makes_one_call_for_all_questions() {
    let (pipeline, handle) = mock_pipeline(vec![success(quiz_json(5))], QuizConfig::default());

    let quiz = pipeline.generate(&study_text(), 5, "hard").await.unwrap();

    assert_eq!(quiz.len(), 5);
    let prompts = handle.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(requested_count(&prompts[0]), 5);
    assert!(prompts[0].contains("Difficulty level: hard"));
    assert!(prompts[0].ends_with(&study_text()));
}

#[tokio::test]
async fn two_chunks_split_the_budget_evenly() {
    let (pipeline, handle) = mock_pipeline(
        vec![success(quiz_json_from(0, 3)), success(quiz_json_from(3, 3))],
        QuizConfig::default(),
    );

    let quiz = pipeline.generate(&paragraphs(20, 500), 6, "medium").await.unwrap();

    let counts: Vec<usize> = handle.prompts().iter().map(|p| requested_count(p)).collect();
    assert_eq!(counts, vec![3, 3]);
    assert_eq!(quiz.len(), 6);
    // Chunk order is preserved
    assert_eq!(quiz.questions[0].question, "Question 0?");
    assert_eq!(quiz.questions[5].question, "Question 5?");
}

#[tokio::test]
async fn fenced_reply_is_unwrapped() {
    let fenced = format!("```json\n{}\n```", quiz_json(2));
    let (pipeline, _handle) = mock_pipeline(vec![success(fenced)], QuizConfig::default());

    let quiz = pipeline.generate(&study_text(), 2, "easy").await.unwrap();
    assert_eq!(quiz.len(), 2);
}

#[tokio::test]
async fn under_production_is_not_an_error() {
    let (pipeline, _handle) = mock_pipeline(vec![success(quiz_json(2))], QuizConfig::default());

    let quiz = pipeline.generate(&study_text(), 5, "medium").await.unwrap();
    assert_eq!(quiz.len(), 2);
}

#[tokio::test]
async fn over_production_is_truncated() {
    let (pipeline, _handle) = mock_pipeline(vec![success(quiz_json(9))], QuizConfig::default());

    let quiz = pipeline.generate(&study_text(), 4, "medium").await.unwrap();
    assert_eq!(quiz.len(), 4);
    assert_eq!(quiz.questions[3].question, "Question 3?");
}

#[tokio::test]
async fn exhausted_budget_skips_remaining_chunks() {
    // Six 500-char paragraphs at a 1100 bound: three chunks of two paragraphs
    let config = QuizConfig::default().with_max_chars(1100);
    let (pipeline, handle) = mock_pipeline(vec![success(quiz_json(3))], config);

    let report = pipeline.generate_detailed(&paragraphs(6, 500), 3, "medium").await.unwrap();

    assert_eq!(handle.call_count(), 1);
    assert_eq!(report.quiz.len(), 3);
    assert_eq!(report.chunks.len(), 1);
    assert_eq!(report.chunks[0].requested, 1);
    assert_eq!(report.chunks[0].returned, 3);
}

#[tokio::test]
async fn never_requests_more_than_asked_for() {
    let config = QuizConfig::default().with_max_chars(1100);
    let (pipeline, handle) = mock_pipeline(
        vec![success(quiz_json(2)), success(quiz_json(2)), success(quiz_json(3))],
        config,
    );

    let report = pipeline.generate_detailed(&paragraphs(6, 500), 7, "medium").await.unwrap();

    let counts: Vec<usize> = handle.prompts().iter().map(|p| requested_count(p)).collect();
    assert_eq!(counts, vec![2, 2, 3]);
    assert_eq!(report.total_requested(), 7);
    assert_eq!(report.quiz.len(), 7);
}

#[tokio::test]
async fn fewer_questions_than_chunks_stops_early() {
    let config = QuizConfig::default().with_max_chars(1100);
    let (pipeline, handle) = mock_pipeline(
        vec![success(quiz_json(1)), success(quiz_json(1)), success(quiz_json(1))],
        config,
    );

    let quiz = pipeline.generate(&paragraphs(6, 500), 2, "medium").await.unwrap();

    assert_eq!(handle.call_count(), 2);
    assert_eq!(quiz.len(), 2);
    assert_eq!(handle.remaining(), 1);
}

#[tokio::test]
async fn short_chunk_reply_carries_budget_to_the_last_chunk() {
    let config = QuizConfig::default().with_max_chars(6000);
    let (pipeline, handle) = mock_pipeline(
        vec![success(quiz_json(1)), success(quiz_json(5))],
        config,
    );

    let quiz = pipeline.generate(&paragraphs(20, 500), 6, "medium").await.unwrap();

    let counts: Vec<usize> = handle.prompts().iter().map(|p| requested_count(p)).collect();
    assert_eq!(counts, vec![3, 5]);
    assert_eq!(quiz.len(), 6);
}

#[tokio::test]
async fn malformed_reply_is_a_retryable_server_error() {
    let (pipeline, _handle) = mock_pipeline(vec![success("Sorry, I can't do that.")], QuizConfig::default());

    let err = pipeline.generate(&study_text(), 3, "medium").await.unwrap_err();

    match &err {
        QuizError::MalformedResponse { chunk, raw, .. } => {
            assert_eq!(*chunk, 0);
            assert_eq!(raw, "Sorry, I can't do that.");
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert!(!err.is_input_error());
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn fail_fast_aborts_on_a_later_chunk() {
    let (pipeline, handle) = mock_pipeline(
        vec![success(quiz_json(3)), MockResponse::Failure("connection reset".into())],
        QuizConfig::default(),
    );

    let err = pipeline.generate(&paragraphs(20, 500), 6, "medium").await.unwrap_err();

    assert!(matches!(err, QuizError::ServiceUnavailable { chunk: 1, source: AIError::Mock(_) }));
    assert_eq!(err.status_code(), 503);
    assert_eq!(handle.call_count(), 2);
}

#[tokio::test]
async fn best_effort_keeps_earlier_chunks() {
    let config = QuizConfig::default().with_failure_policy(FailurePolicy::BestEffort);
    let (pipeline, _handle) = mock_pipeline(
        vec![success(quiz_json(3)), MockResponse::Failure("connection reset".into())],
        config,
    );

    let report = pipeline.generate_detailed(&paragraphs(20, 500), 6, "medium").await.unwrap();

    assert_eq!(report.quiz.len(), 3);
    assert!(report.is_partial());
    let failed: Vec<usize> = report.failures().map(|c| c.index).collect();
    assert_eq!(failed, vec![1]);
    assert!(matches!(report.chunks[1].error, Some(QuizError::ServiceUnavailable { chunk: 1, .. })));
}

#[tokio::test]
async fn best_effort_continues_past_a_failed_first_chunk() {
    let config = QuizConfig::default().with_failure_policy(FailurePolicy::BestEffort);
    let (pipeline, handle) = mock_pipeline(
        vec![success("not json"), success(quiz_json(6))],
        config,
    );

    let quiz = pipeline.generate(&paragraphs(20, 500), 6, "medium").await.unwrap();

    // The failed chunk returned nothing, so the last chunk is asked for everything
    let counts: Vec<usize> = handle.prompts().iter().map(|p| requested_count(p)).collect();
    assert_eq!(counts, vec![3, 6]);
    assert_eq!(quiz.len(), 6);
}

#[tokio::test]
async fn best_effort_with_every_chunk_failing_is_an_error() {
    let config = QuizConfig::default().with_failure_policy(FailurePolicy::BestEffort);
    let (pipeline, _handle) = mock_pipeline(
        vec![MockResponse::Failure("down".into()), MockResponse::Failure("still down".into())],
        config,
    );

    let err = pipeline.generate(&paragraphs(20, 500), 6, "medium").await.unwrap_err();
    assert!(matches!(err, QuizError::ServiceUnavailable { chunk: 0, .. }));
}

#[tokio::test]
async fn empty_text_is_rejected_before_any_call() {
    let (pipeline, handle) = mock_pipeline(vec![], QuizConfig::default());

    let err = pipeline.generate("  \n\n  ", 5, "medium").await.unwrap_err();

    assert!(matches!(err, QuizError::EmptyText));
    assert!(err.is_input_error());
    assert_eq!(handle.call_count(), 0);
}

#[tokio::test]
async fn question_count_is_bounded() {
    let (pipeline, handle) = mock_pipeline(vec![], QuizConfig::default().with_max_questions(50));

    let zero = pipeline.generate(&study_text(), 0, "medium").await.unwrap_err();
    assert!(matches!(zero, QuizError::InvalidQuestionCount { requested: 0, max: 50 }));

    let too_many = pipeline.generate(&study_text(), 51, "medium").await.unwrap_err();
    assert!(matches!(too_many, QuizError::InvalidQuestionCount { requested: 51, max: 50 }));
    assert_eq!(too_many.status_code(), 400);

    assert_eq!(handle.call_count(), 0);
}

#[tokio::test]
async fn slow_call_times_out() {
    let config = QuizConfig::default().with_timeout(Duration::from_millis(50));
    let (pipeline, _handle) = mock_pipeline(
        vec![MockResponse::Delayed(Duration::from_secs(5), quiz_json(1))],
        config,
    );

    let err = pipeline.generate(&study_text(), 1, "medium").await.unwrap_err();

    assert!(matches!(err, QuizError::ServiceUnavailable { source: AIError::Timeout(_), .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn configured_retry_recovers_a_failed_call() {
    let config = QuizConfig::default().with_retry(RetryConfig::default().with_retries("api_error", 1));
    let (pipeline, handle) = mock_pipeline(
        vec![MockResponse::Failure("overloaded".into()), success(quiz_json(2))],
        config,
    );

    let quiz = pipeline.generate(&study_text(), 2, "medium").await.unwrap();

    assert_eq!(quiz.len(), 2);
    assert_eq!(handle.call_count(), 2);
}

#[tokio::test]
async fn default_config_does_not_retry() {
    let (pipeline, handle) = mock_pipeline(
        vec![MockResponse::Failure("overloaded".into()), success(quiz_json(2))],
        QuizConfig::default(),
    );

    assert!(pipeline.generate(&study_text(), 2, "medium").await.is_err());
    assert_eq!(handle.call_count(), 1);
}

#[tokio::test]
async fn reply_without_questions_yields_empty_quiz() {
    let (pipeline, _handle) = mock_pipeline(vec![success(r#"{"note": "no questions"}"#)], QuizConfig::default());

    let quiz = pipeline.generate(&study_text(), 3, "medium").await.unwrap();
    assert!(quiz.is_empty());
}

#[tokio::test]
async fn quiz_serializes_to_the_reply_shape() {
    let (pipeline, _handle) = mock_pipeline(vec![success(quiz_json(1))], QuizConfig::default());

    let quiz = pipeline.generate(&study_text(), 1, "medium").await.unwrap();
    let value = serde_json::to_value(&quiz).unwrap();

    assert_eq!(value["questions"][0]["options"].as_array().unwrap().len(), 4);
    assert_eq!(value["questions"][0]["options"][0]["is_correct"], true);
    assert!(value["questions"][0]["concept_summary"].is_string());
}

#[tokio::test]
async fn interceptor_records_each_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, _handle) = mock_pipeline(
        vec![success(quiz_json(3)), success(quiz_json(3))],
        QuizConfig::default(),
    );
    let pipeline = pipeline.with_interceptor(Arc::new(FileInterceptor::new(dir.path())));

    pipeline.generate(&paragraphs(20, 500), 6, "medium").await.unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 2);
    let first = files[0].as_ref().unwrap().path();
    let content = std::fs::read_to_string(first).unwrap();
    assert!(content.starts_with("# Prompt"));
    assert!(content.contains("# Response"));
}

#[derive(Debug, Default)]
struct BrokenInterceptor {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Interceptor for BrokenInterceptor {
    async fn save(&self, _prompt: &str, _response: &str) -> std::io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only disk"))
    }
}

#[tokio::test]
async fn failing_interceptor_does_not_fail_the_request() {
    let interceptor = Arc::new(BrokenInterceptor::default());
    let (pipeline, _handle) = mock_pipeline(
        vec![success(quiz_json(3)), success(quiz_json(3))],
        QuizConfig::default(),
    );
    let pipeline = pipeline.with_interceptor(interceptor.clone());

    let quiz = pipeline.generate(&paragraphs(20, 500), 6, "medium").await.unwrap();

    assert_eq!(quiz.len(), 6);
    assert_eq!(interceptor.calls.load(Ordering::SeqCst), 2);
}
