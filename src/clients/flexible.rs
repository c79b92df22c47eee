#[cfg(feature = "anthropic")]
use super::claude::{ClaudeClient, ClaudeConfig, ClaudeModel};
use super::mock::{MockClient, MockHandle, MockResponse};
#[cfg(feature = "openai")]
use super::openai::{OpenAIClient, OpenAIConfig, OpenAIModel};
#[cfg(any(feature = "anthropic", feature = "openai"))]
use crate::config::KeyFromEnv;
use crate::config::QuizConfig;
use crate::core::LowLevelClient;
use crate::error::AIError;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Which generation service to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientType {
    #[cfg(feature = "anthropic")]
    Claude,
    #[cfg(feature = "openai")]
    OpenAI,
    Mock,
}

impl Default for ClientType {
    /// Pick a client based on which API key is available, preferring Claude.
    fn default() -> Self {
        detect_claude().or_else(detect_openai).unwrap_or(Self::Mock)
    }
}

#[cfg(feature = "anthropic")]
fn detect_claude() -> Option<ClientType> {
    ClaudeClient::key_available().then_some(ClientType::Claude)
}

#[cfg(not(feature = "anthropic"))]
fn detect_claude() -> Option<ClientType> {
    None
}

#[cfg(feature = "openai")]
fn detect_openai() -> Option<ClientType> {
    OpenAIClient::key_available().then_some(ClientType::OpenAI)
}

#[cfg(not(feature = "openai"))]
fn detect_openai() -> Option<ClientType> {
    None
}

impl FromStr for ClientType {
    type Err = String;

    /// Parse client type from string (case insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            #[cfg(feature = "anthropic")]
            "claude" | "anthropic" => Ok(Self::Claude),
            #[cfg(feature = "openai")]
            "openai" | "gpt" => Ok(Self::OpenAI),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown client type: '{}'. Supported: claude, openai, mock", s)),
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "anthropic")]
            ClientType::Claude => write!(f, "Claude"),
            #[cfg(feature = "openai")]
            ClientType::OpenAI => write!(f, "OpenAI"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

impl ClientType {
    /// Resolve an optional configured name, auto-detecting when unset.
    pub fn resolve(name: Option<&str>) -> Result<Self, String> {
        match name {
            Some(name) => name.parse(),
            None => Ok(Self::default()),
        }
    }
}

/// Client chosen at runtime that forwards to any `LowLevelClient`.
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<dyn LowLevelClient>,
}

impl FlexibleClient {
    /// Create a new FlexibleClient wrapping the given client
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: Arc::from(client) }
    }

    /// Build the client named by `client_type`, applying a model override if given.
    ///
    /// A mock built this way has no handle and always answers with an empty quiz.
    pub fn for_type(client_type: &ClientType, model: Option<&str>) -> Self {
        info!(client = %client_type, model = ?model, "Selecting generation client");
        match client_type {
            #[cfg(feature = "anthropic")]
            ClientType::Claude => {
                let mut config = ClaudeConfig::default();
                if let Some(model) = model {
                    config = config.with_model(ClaudeModel::Override(model.to_string()));
                }
                Self::claude(config)
            }
            #[cfg(feature = "openai")]
            ClientType::OpenAI => {
                let mut config = OpenAIConfig::default();
                if let Some(model) = model {
                    config = config.with_model(OpenAIModel::Override(model.to_string()));
                }
                Self::openai(config)
            }
            ClientType::Mock => Self::mock().0,
        }
    }

    /// Build the client selected by `QUIZ_CLIENT` / `QUIZ_MODEL`.
    pub fn from_config(config: &QuizConfig) -> Result<Self, String> {
        let client_type = ClientType::resolve(config.client.as_deref())?;
        Ok(Self::for_type(&client_type, config.model.as_deref()))
    }

    #[cfg(feature = "anthropic")]
    pub fn claude(config: ClaudeConfig) -> Self {
        Self::new(Box::new(ClaudeClient::new(config)))
    }

    #[cfg(feature = "openai")]
    pub fn openai(config: OpenAIConfig) -> Self {
        Self::new(Box::new(OpenAIClient::new(config)))
    }

    /// Create a FlexibleClient with a mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::new();
        (Self::new(Box::new(mock_client)), handle)
    }

    /// Create a FlexibleClient mock with predefined responses
    pub fn mock_with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::with_responses(responses);
        (Self::new(Box::new(mock_client)), handle)
    }

    /// Clone out the wrapped client
    pub fn into_inner(self) -> Box<dyn LowLevelClient> {
        self.inner.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.inner.ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
