#[cfg(feature = "anthropic")]
pub mod claude;
pub mod flexible;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub use claude::*;
pub use flexible::*;
pub use mock::*;
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig, OpenAIModel};
