use crate::chunking::DEFAULT_MAX_CHARS;
use crate::core::RetryConfig;
use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME).ok().filter(|k| !k.trim().is_empty())
    }

    /// True if the key is set in the environment or mentioned in `.env`.
    fn key_available() -> bool {
        env::var(Self::KEY_NAME).is_ok()
            || std::fs::read_to_string(".env").map_or(false, |content| content.contains(Self::KEY_NAME))
    }
}

/// What the pipeline does when one chunk's generation call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole request with the chunk's error.
    #[default]
    FailFast,
    /// Record the failure, keep going, and return what was gathered.
    BestEffort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fail-fast" => Ok(Self::FailFast),
            "best-effort" => Ok(Self::BestEffort),
            _ => Err(format!("Unknown failure policy: '{}'. Supported: fail-fast, best-effort", s)),
        }
    }
}

/// Settings for quiz generation and usage metering.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    /// Chunk bound in characters
    pub max_chars: usize,
    /// Upper bound on questions per request
    pub max_questions: usize,
    /// Model identifier override; `None` uses the client's default
    pub model: Option<String>,
    /// Client selection (`claude`, `openai`, `mock`); `None` auto-detects
    pub client: Option<String>,
    /// Bound on each generation call
    pub request_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub retry: RetryConfig,
    /// Free-tier generations per identity per UTC day
    pub free_daily_limit: u32,
    /// Minimum characters extracted text must have before generating
    pub min_text_chars: usize,
    /// Where prompt/response transcripts are written, if anywhere
    pub transcript_dir: Option<PathBuf>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            max_questions: 50,
            model: None,
            client: None,
            request_timeout: Duration::from_secs(120),
            failure_policy: FailurePolicy::default(),
            retry: RetryConfig::default(),
            free_daily_limit: 3,
            min_text_chars: 50,
            transcript_dir: None,
        }
    }
}

impl QuizConfig {
    /// Read `QUIZ_*` variables from the environment (and `.env`), falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("QUIZ_MAX_CHARS") {
            config.max_chars = parse_positive("QUIZ_MAX_CHARS", &v)?;
        }
        if let Some(v) = get("QUIZ_MAX_QUESTIONS") {
            config.max_questions = parse_positive("QUIZ_MAX_QUESTIONS", &v)?;
        }
        if let Some(v) = get("QUIZ_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_positive("QUIZ_TIMEOUT_SECS", &v)? as u64);
        }
        if let Some(v) = get("QUIZ_FAILURE_POLICY") {
            config.failure_policy = v
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "QUIZ_FAILURE_POLICY", value: v.clone() })?;
        }
        if let Some(v) = get("QUIZ_FREE_DAILY_LIMIT") {
            config.free_daily_limit = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "QUIZ_FREE_DAILY_LIMIT", value: v.clone() })?;
        }
        if let Some(v) = get("QUIZ_MIN_TEXT_CHARS") {
            config.min_text_chars = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "QUIZ_MIN_TEXT_CHARS", value: v.clone() })?;
        }
        config.model = get("QUIZ_MODEL").map(|v| v.trim().to_string());
        config.client = get("QUIZ_CLIENT").map(|v| v.trim().to_string());
        config.transcript_dir = get("QUIZ_TRANSCRIPT_DIR").map(PathBuf::from);

        Ok(config)
    }

    #[must_use]
    pub const fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    #[must_use]
    pub const fn with_max_questions(mut self, max_questions: usize) -> Self {
        self.max_questions = max_questions;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_free_daily_limit(mut self, limit: u32) -> Self {
        self.free_daily_limit = limit;
        self
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { key, value: value.to_string() }),
    }
}
