use crate::config::KeyFromEnv;
use crate::core::LowLevelClient;
use crate::error::{AIError, ClaudeError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

/// Anthropic API root; `/messages` is appended.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClaudeModel {
    Opus4,
    #[default]
    Sonnet4,
    Sonnet37,
    Haiku35,
    Override(String),
}

impl ClaudeModel {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Opus4 => "claude-opus-4-20250514",
            Self::Sonnet4 => "claude-sonnet-4-20250514",
            Self::Sonnet37 => "claude-3-7-sonnet-20250219",
            Self::Haiku35 => "claude-3-5-haiku-20241022",
            Self::Override(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub model: ClaudeModel,
    pub api_key: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            model: ClaudeModel::default(),
            api_key: ClaudeClient::find_key().unwrap_or_default(),
            max_tokens: 4096,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ClaudeConfig {
    #[must_use]
    pub fn new(api_key: String, model: ClaudeModel) -> Self {
        Self { model, api_key, max_tokens: 4096, base_url: DEFAULT_BASE_URL.to_string() }
    }

    #[must_use]
    pub fn with_model(mut self, model: ClaudeModel) -> Self {
        self.model = model;
        self
    }

    /// Send requests to another API root, e.g. a proxy.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ClaudeMessage; 1],
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API client.
#[derive(Clone, Debug)]
pub struct ClaudeClient {
    config: ClaudeConfig,
    client: Client,
}

impl KeyFromEnv for ClaudeClient {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl Default for ClaudeClient {
    fn default() -> Self {
        Self::new(ClaudeConfig::default())
    }
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        info!(model = %config.model.id(), "Creating new Claude client");
        Self { config, client: Client::new() }
    }

    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }
}

#[async_trait]
impl LowLevelClient for ClaudeClient {
    #[instrument(skip(self, prompt), fields(model = %self.config.model.id(), prompt_len = prompt.len()))]
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        let request = ClaudeRequest {
            model: self.config.model.id(),
            max_tokens: self.config.max_tokens,
            messages: [ClaudeMessage { role: "user", content: prompt }],
        };

        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                ClaudeError::Http(e.to_string())
            })?;

        debug!(status = %response.status(), "Received response from Anthropic API");

        if response.status() == 429 {
            warn!("Anthropic API rate limit exceeded");
            return Err(ClaudeError::RateLimit.into());
        }

        if response.status() == 401 {
            error!("Anthropic API authentication failed");
            return Err(ClaudeError::Authentication.into());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Anthropic API error");
            return Err(ClaudeError::Api(error_text).into());
        }

        let parsed: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic response JSON");
            ClaudeError::Http(e.to_string())
        })?;

        let text = parsed
            .content
            .into_iter()
            .next()
            .map(|content| content.text)
            .ok_or_else(|| ClaudeError::Api("No content in response".to_string()))?;

        info!(response_len = text.len(), "Received Anthropic response");
        Ok(text)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
