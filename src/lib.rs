pub mod chunking;
pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod extract;
pub mod interceptors;
pub mod json_utils;
pub mod pipeline;
pub mod prompt;
pub mod quiz;
pub mod service;
pub mod usage;

// Convenient re-exports
pub use chunking::chunk_text;
pub use config::{FailurePolicy, QuizConfig};
pub use error::{AIError, QuizError};
pub use pipeline::QuizPipeline;
pub use quiz::{GenerationReport, OptionSpec, QuestionSpec, QuizResult};
