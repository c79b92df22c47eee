//! Client abstraction for the generation service plus retry settings.

use crate::error::AIError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;

/// Low-level model client abstraction.
///
/// Implementors provide `ask_raw`, which executes a prompt and returns the raw
/// model text. Unwrapping and validating the reply is done by the pipeline.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    /// The only method that implementations must provide
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;
}

// Implement Clone for Box<dyn LowLevelClient>
impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// Implement LowLevelClient for Box<dyn LowLevelClient>
#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }
}

/// Per-chunk retry budget, keyed by failure kind.
///
/// Kinds: `rate_limit`, `http_error`, `api_error`, `timeout`,
/// `authentication`, `malformed_response`. Kinds without an entry use
/// `default_max_retries`. The default never retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: HashMap<String, usize>,
    pub default_max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let mut max_retries = HashMap::new();
        max_retries.insert("rate_limit".to_string(), 0);
        max_retries.insert("api_error".to_string(), 0);
        max_retries.insert("http_error".to_string(), 0);
        max_retries.insert("timeout".to_string(), 0);
        max_retries.insert("authentication".to_string(), 0);
        max_retries.insert("malformed_response".to_string(), 0);

        Self {
            max_retries,
            default_max_retries: 0,
        }
    }
}

impl RetryConfig {
    pub fn retries_for(&self, kind: &str) -> usize {
        self.max_retries.get(kind).copied().unwrap_or(self.default_max_retries)
    }

    #[must_use]
    pub fn with_retries(mut self, kind: &str, retries: usize) -> Self {
        self.max_retries.insert(kind.to_string(), retries);
        self
    }
}
