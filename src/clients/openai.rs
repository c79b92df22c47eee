pub mod models;

pub use models::OpenAIModel;

use crate::config::KeyFromEnv;
use crate::core::LowLevelClient;
use crate::error::{AIError, OpenAIError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

/// OpenAI API root; `/chat/completions` is appended.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: OpenAIModel,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the API to guarantee a JSON object reply
    pub json_mode: bool,
    pub base_url: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: OpenAIClient::find_key().unwrap_or_default(),
            model: OpenAIModel::default(),
            max_tokens: 4096,
            temperature: 0.7,
            json_mode: true,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenAIConfig {
    #[must_use]
    pub fn new(api_key: String, model: OpenAIModel) -> Self {
        Self { api_key, model, ..Default::default() }
    }

    #[must_use]
    pub fn with_model(mut self, model: OpenAIModel) -> Self {
        self.model = model;
        self
    }

    /// Send requests to another API root, e.g. Azure or a local gateway.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct OpenAIClient {
    config: OpenAIConfig,
    http: reqwest::Client,
}

impl KeyFromEnv for OpenAIClient {
    const KEY_NAME: &'static str = "OPENAI_API_KEY";
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new(OpenAIConfig::default())
    }
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Self {
        info!(model = %config.model.id(), name = config.model.display_name(), "Creating new OpenAI client");
        Self { config, http: reqwest::Client::new() }
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn messages_body(&self, prompt: String) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model.id(),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        });
        if self.config.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait]
impl LowLevelClient for OpenAIClient {
    #[instrument(skip(self, prompt), fields(model = %self.config.model.id(), prompt_len = prompt.len()))]
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        let body = self.messages_body(prompt);
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                OpenAIError::Http(e.to_string())
            })?;

        debug!(status = %resp.status(), "Received response from OpenAI API");

        if resp.status() == 401 {
            error!("OpenAI API authentication failed");
            return Err(OpenAIError::Authentication.into());
        }
        if resp.status() == 429 {
            warn!("OpenAI API rate limit exceeded");
            return Err(OpenAIError::RateLimit.into());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %txt, "OpenAI API error");
            return Err(OpenAIError::Api(txt).into());
        }

        #[derive(Deserialize)]
        struct Choices { choices: Vec<Choice> }
        #[derive(Deserialize)]
        struct Choice { message: Msg }
        #[derive(Deserialize)]
        struct Msg { content: Option<String> }

        let parsed: Choices = resp.json().await.map_err(|e| OpenAIError::Http(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Api("No choices".into()))?;

        info!(response_len = content.len(), "Received OpenAI response");
        Ok(content)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
