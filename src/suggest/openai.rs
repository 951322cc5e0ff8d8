//! OpenAI-compatible chat-completions suggester

use super::prompt::PromptBuilder;
use super::{MessageSuggester, SuggestError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Suggests messages through `POST {base_url}/chat/completions`
pub struct OpenAiSuggester {
    /// Base URL for the API
    base_url: String,

    /// Bearer credential
    api_key: String,

    /// Upper bound on generated tokens
    max_completion_tokens: u32,

    prompts: PromptBuilder,

    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiSuggester {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_completion_tokens: 4000,
            prompts: PromptBuilder::new(),
            client,
        }
    }

    /// Set the completion token limit
    pub fn with_max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = tokens;
        self
    }

    fn chat_completion_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> SuggestError {
        let message = format!("HTTP {}: {}", status, body);
        match status.as_u16() {
            401 | 403 => SuggestError::auth(message),
            429 => SuggestError::RateLimit { message },
            408 | 504 => SuggestError::Network {
                message: format!("upstream timeout: {}", message),
            },
            400..=499 => SuggestError::Request { message },
            _ => SuggestError::network(message),
        }
    }
}

#[async_trait]
impl MessageSuggester for OpenAiSuggester {
    async fn suggest(&self, model: &str, diff: &str, old_message: &str) -> Result<String, SuggestError> {
        let prompt = self.prompts.build(diff, old_message)?;

        let body = ChatCompletionRequest {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_completion_tokens: self.max_completion_tokens,
        };

        let response = self
            .client
            .post(self.chat_completion_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SuggestError::network(format!("connection failed: {}", e))
                } else {
                    SuggestError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SuggestError::parse(format!("failed to parse response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(SuggestError::EmptyResponse)
    }
}
