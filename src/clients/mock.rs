use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{core::LowLevelClient, error::AIError};

/// Reply returned when the script has run out.
const EMPTY_QUIZ: &str = r#"{"questions": []}"#;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Raw reply text, returned as-is
    Success(String),
    /// Fails the call with `AIError::Mock`
    Failure(String),
    /// Sleeps before replying, for exercising timeouts
    Delayed(Duration, String),
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<MockResponse>,
    prompts: Vec<String>,
}

/// Shared control over a [`MockClient`]: queue replies, inspect prompts.
#[derive(Debug, Default)]
pub struct MockHandle {
    state: Mutex<MockState>,
}

impl MockHandle {
    pub fn push(&self, response: MockResponse) {
        self.lock().responses.push_back(response);
    }

    pub fn push_success(&self, raw: impl Into<String>) {
        self.push(MockResponse::Success(raw.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.push(MockResponse::Failure(message.into()));
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the script from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scripted client for tests and offline runs.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = Self::new();
        for response in responses {
            handle.push(response);
        }
        (client, handle)
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        let next = {
            let mut state = self.handle.lock();
            state.prompts.push(prompt);
            state.responses.pop_front()
        };

        match next {
            Some(MockResponse::Success(raw)) => Ok(raw),
            Some(MockResponse::Failure(message)) => Err(AIError::Mock(message)),
            Some(MockResponse::Delayed(delay, raw)) => {
                tokio::time::sleep(delay).await;
                Ok(raw)
            }
            None => Ok(EMPTY_QUIZ.to_string()),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
