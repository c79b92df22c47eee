
use crate::test_utils::{quiz_json, success};
use studyquiz::clients::{ClientType, FlexibleClient, MockClient, MockResponse};
use studyquiz::core::LowLevelClient;
use studyquiz::AIError;

#[tokio::test]
async fn mock_replays_its_script_in_order() {
    let (client, handle) = MockClient::with_responses(vec![
        success("first"),
        MockResponse::Failure("boom".into()),
    ]);

    assert_eq!(client.ask_raw("p1".into()).await.unwrap(), "first");
    assert!(matches!(client.ask_raw("p2".into()).await, Err(AIError::Mock(m)) if m == "boom"));
    assert_eq!(handle.prompts(), vec!["p1".to_string(), "p2".to_string()]);
}

#[tokio::test]
async fn exhausted_mock_answers_with_an_empty_quiz() {
    let (client, _handle) = MockClient::new();
    let raw = client.ask_raw("anything".into()).await.unwrap();
    assert_eq!(studyquiz::json_utils::parse_quiz_reply(&raw).unwrap().len(), 0);
}

#[tokio::test]
async fn flexible_client_forwards_to_the_wrapped_client() {
    let (client, handle) = FlexibleClient::mock_with_responses(vec![success(quiz_json(1))]);
    let cloned = client.clone();

    assert_eq!(cloned.ask_raw("hello".into()).await.unwrap(), quiz_json(1));
    assert_eq!(handle.call_count(), 1);

    handle.push_success("later");
    let boxed = client.into_inner();
    assert_eq!(boxed.ask_raw("again".into()).await.unwrap(), "later");
}

#[test]
fn mock_client_type_needs_no_key() {
    assert_eq!(ClientType::resolve(Some("MOCK")).unwrap(), ClientType::Mock);
    assert_eq!(ClientType::Mock.to_string(), "Mock");
    assert!(ClientType::resolve(Some("llama")).is_err());
}

#[cfg(feature = "anthropic")]
#[test]
fn claude_model_override_is_sent_verbatim() {
    use studyquiz::clients::{ClaudeConfig, ClaudeModel};

    let config = ClaudeConfig::new("key".into(), ClaudeModel::default())
        .with_model(ClaudeModel::Override("claude-custom".into()));
    assert_eq!(config.model.id(), "claude-custom");
    assert_eq!(ClaudeModel::default().id(), "claude-sonnet-4-20250514");
}

#[cfg(feature = "openai")]
#[test]
fn openai_defaults_to_json_mode() {
    use studyquiz::clients::{OpenAIConfig, OpenAIModel};

    let config = OpenAIConfig::new("key".into(), OpenAIModel::Gpt4oMini);
    assert!(config.json_mode);
    assert_eq!(config.model.id(), "gpt-4o-mini");
}
