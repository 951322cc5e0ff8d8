//! Commit message suggestion port
//!
//! The rest of the pipeline only sees [`MessageSuggester`]: one call that
//! turns `(model, diff, old message)` into a new message. [`OpenAiSuggester`]
//! talks to an OpenAI-compatible chat-completions endpoint.

mod openai;
mod prompt;
#[cfg(test)]
mod scripted;
mod types;

pub use openai::OpenAiSuggester;
#[cfg(test)]
pub use scripted::ScriptedSuggester;
pub use types::SuggestError;

use crate::config::{ConfigError, SuggestConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of replacement commit messages
#[async_trait]
pub trait MessageSuggester: Send + Sync {
    /// Suggest a message for a commit given its diff and current message
    async fn suggest(&self, model: &str, diff: &str, old_message: &str) -> Result<String, SuggestError>;
}

/// Shared suggesters delegate to the inner implementation
#[async_trait]
impl<T: MessageSuggester + ?Sized> MessageSuggester for Arc<T> {
    async fn suggest(&self, model: &str, diff: &str, old_message: &str) -> Result<String, SuggestError> {
        (**self).suggest(model, diff, old_message).await
    }
}

/// Build the production suggester; fails when no credential is configured
pub fn create_suggester(config: &SuggestConfig) -> Result<Box<dyn MessageSuggester>, ConfigError> {
    let api_key = config.require_api_key()?;
    let suggester = OpenAiSuggester::new(config.base_url.clone(), api_key)
        .with_max_completion_tokens(config.max_completion_tokens);
    Ok(Box::new(suggester))
}

/// Call `suggester` under an independent deadline.
///
/// Responses that are empty once whitespace and code fences are stripped are
/// failures, not zero-length messages.
pub async fn suggest_with_deadline(
    suggester: &dyn MessageSuggester,
    model: &str,
    diff: &str,
    old_message: &str,
    deadline: Duration,
) -> Result<String, SuggestError> {
    let start = Instant::now();

    let text = tokio::time::timeout(deadline, suggester.suggest(model, diff, old_message))
        .await
        .map_err(|_| SuggestError::timeout(start.elapsed()))??;

    let text = strip_decoration(&text);
    if text.is_empty() {
        return Err(SuggestError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Trim whitespace and surrounding backtick fences
pub fn strip_decoration(text: &str) -> &str {
    text.trim().trim_matches(|c: char| c == '`' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_decoration() {
        assert_eq!(strip_decoration("```\nfix: x\n```\n"), "fix: x");
        assert_eq!(strip_decoration("  feat: y  "), "feat: y");
        assert_eq!(strip_decoration("```\n```"), "");
    }

    #[tokio::test]
    async fn test_decoration_only_response_fails() {
        let suggester = ScriptedSuggester::new().respond("```\n\n```");
        let err = suggest_with_deadline(&suggester, "m", "diff", "old", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let suggester = ScriptedSuggester::new()
            .respond("fix: late")
            .with_delay(Duration::from_secs(5));
        let err = suggest_with_deadline(&suggester, "m", "diff", "old", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_service_error_passes_through() {
        let suggester = ScriptedSuggester::new().fail(SuggestError::auth("HTTP 401"));
        let err = suggest_with_deadline(&suggester, "m", "diff", "old", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::Auth { .. }));
    }

    #[test]
    fn test_create_suggester_requires_key() {
        let config = SuggestConfig::default();
        assert!(matches!(
            create_suggester(&config),
            Err(ConfigError::MissingCredential { .. })
        ));

        let config = SuggestConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        assert!(create_suggester(&config).is_ok());
    }
}
