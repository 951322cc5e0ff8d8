//! Deterministic suggester for tests

use super::{MessageSuggester, SuggestError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A recorded `suggest` call
#[derive(Debug, Clone)]
pub struct SuggestCall {
    pub model: String,
    pub diff: String,
    pub old_message: String,
}

/// Returns queued responses in order and records each call
pub struct ScriptedSuggester {
    responses: Mutex<VecDeque<Result<String, SuggestError>>>,
    calls: Mutex<Vec<SuggestCall>>,
    delay: Option<Duration>,
}

impl ScriptedSuggester {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queue a successful response
    pub fn respond(self, text: &str) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    /// Queue a failure
    pub fn fail(self, err: SuggestError) -> Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SuggestCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSuggester for ScriptedSuggester {
    async fn suggest(&self, model: &str, diff: &str, old_message: &str) -> Result<String, SuggestError> {
        self.calls.lock().unwrap().push(SuggestCall {
            model: model.to_string(),
            diff: diff.to_string(),
            old_message: old_message.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SuggestError::network("no scripted response left")))
    }
}
