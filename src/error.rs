use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("source text is empty")]
    EmptyText,
    #[error("invalid question count {requested}: must be between 1 and {max}")]
    InvalidQuestionCount { requested: usize, max: usize },
    #[error("malformed model response for chunk {chunk}: {source}. Raw response: {raw}")]
    MalformedResponse {
        chunk: usize,
        #[source]
        source: serde_json::Error,
        raw: String,
    },
    #[error("generation service unavailable for chunk {chunk}: {source}")]
    ServiceUnavailable {
        chunk: usize,
        #[source]
        source: AIError,
    },
}

impl QuizError {
    /// Input errors are the caller's fault; everything else is a server-side failure.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::EmptyText | Self::InvalidQuestionCount { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmptyText | Self::InvalidQuestionCount { .. } => false,
            Self::MalformedResponse { .. } => true,
            Self::ServiceUnavailable { source, .. } => source.is_transient(),
        }
    }

    /// HTTP status an outer web layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyText => 422,
            Self::InvalidQuestionCount { .. } => 400,
            Self::MalformedResponse { .. } => 502,
            Self::ServiceUnavailable { .. } => 503,
        }
    }

    /// Retry-config key for this failure, if it came from the generation call.
    pub(crate) fn retry_kind(&self) -> Option<&'static str> {
        match self {
            Self::MalformedResponse { .. } => Some("malformed_response"),
            Self::ServiceUnavailable { source, .. } => Some(source.retry_kind()),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Mock error: {0}")]
    Mock(String),
}

impl AIError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Claude(ClaudeError::Authentication) | Self::OpenAI(OpenAIError::Authentication) => false,
            _ => true,
        }
    }

    pub(crate) fn retry_kind(&self) -> &'static str {
        match self {
            Self::Claude(ClaudeError::RateLimit) | Self::OpenAI(OpenAIError::RateLimit) => "rate_limit",
            Self::Claude(ClaudeError::Http(_)) | Self::OpenAI(OpenAIError::Http(_)) => "http_error",
            Self::Claude(ClaudeError::Authentication) | Self::OpenAI(OpenAIError::Authentication) => "authentication",
            Self::Timeout(_) => "timeout",
            _ => "api_error",
        }
    }
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("free limit of {limit} quizzes per day reached")]
    LimitReached { limit: u32 },
    #[error("usage store error: {0}")]
    Store(String),
}

impl UsageError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::LimitReached { .. } => 429,
            Self::Store(_) => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("document is not valid UTF-8 text")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("could not read document: {0}")]
    Unreadable(String),
    #[error("could not extract enough text: found {found} characters, need at least {min}")]
    TooShort { found: usize, min: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Usage(e) => e.status_code(),
            Self::Extract(_) => 422,
            Self::Quiz(e) => e.status_code(),
        }
    }
}
