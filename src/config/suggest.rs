//! Suggestion service configuration

use super::ConfigError;
use crate::git::DIFF_CHAR_BUDGET;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the credential
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Connection and request settings for the suggestion service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestConfig {
    /// Bearer credential
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-commit deadline in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,

    /// Characters of diff sent per commit
    #[serde(default = "default_diff_char_budget")]
    pub diff_char_budget: usize,
}

pub(super) fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub(super) fn default_model() -> String {
    "gpt-5-nano".to_string()
}

pub(super) fn default_timeout() -> u64 {
    25
}

pub(super) fn default_max_completion_tokens() -> u32 {
    4000
}

pub(super) fn default_diff_char_budget() -> usize {
    DIFF_CHAR_BUDGET
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
            max_completion_tokens: default_max_completion_tokens(),
            diff_char_budget: default_diff_char_budget(),
        }
    }
}

impl SuggestConfig {
    /// The credential, or a configuration error when none is set
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential {
                variable: API_KEY_VAR,
            })
    }

    /// Per-commit deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let config: SuggestConfig = toml::from_str("").unwrap();
        assert_eq!(config, SuggestConfig::default());
        assert_eq!(config.model, "gpt-5-nano");
        assert_eq!(config.timeout(), Duration::from_secs(25));
        assert_eq!(config.diff_char_budget, 40_000);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            api_key = "sk-file"
            base_url = "http://localhost:11434/v1"
            model = "qwen3-coder"
            timeout_secs = 60
            max_completion_tokens = 512
            diff_char_budget = 1000
        "#;
        let config: SuggestConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.require_api_key().unwrap(), "sk-file");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.diff_char_budget, 1000);
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = SuggestConfig {
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingCredential { variable: "OPENAI_API_KEY" })
        ));
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<SuggestConfig, _> = toml::from_str("temperature = 0.2");
        assert!(result.is_err());
    }
}
