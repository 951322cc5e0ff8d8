//! Configuration loading with multi-layer merge

use super::suggest::{
    default_base_url, default_diff_char_budget, default_max_completion_tokens, default_model,
    default_timeout,
};
use super::{ConfigError, SuggestConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level git-smartmsg configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmartmsgConfig {
    /// Suggestion service settings
    #[serde(default)]
    pub suggest: SuggestConfig,

    /// Planning defaults
    #[serde(default)]
    pub plan: PlanDefaults,
}

/// Defaults for the `plan` command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDefaults {
    /// Commits back from the tip when no range is given
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Where plans are written and read
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_limit() -> usize {
    20
}

fn default_output() -> String {
    "plan.json".to_string()
}

impl Default for PlanDefaults {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            output: default_output(),
        }
    }
}

impl SmartmsgConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/git-smartmsg/config.toml
    /// 3. .smartmsg/config.toml (project)
    /// 4. OPENAI_API_KEY, OPENAI_API_BASE, OPENAI_MODEL
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                config.merge(Self::load_file(&user_config_path)?);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".smartmsg/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".smartmsg/config.toml"));
        if project_config_path.exists() {
            config.merge(Self::load_file(&project_config_path)?);
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the user config path (~/.config/git-smartmsg/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("git-smartmsg/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        let suggest = other.suggest;
        if suggest.api_key.is_some() {
            self.suggest.api_key = suggest.api_key;
        }
        if suggest.base_url != default_base_url() {
            self.suggest.base_url = suggest.base_url;
        }
        if suggest.model != default_model() {
            self.suggest.model = suggest.model;
        }
        if suggest.timeout_secs != default_timeout() {
            self.suggest.timeout_secs = suggest.timeout_secs;
        }
        if suggest.max_completion_tokens != default_max_completion_tokens() {
            self.suggest.max_completion_tokens = suggest.max_completion_tokens;
        }
        if suggest.diff_char_budget != default_diff_char_budget() {
            self.suggest.diff_char_budget = suggest.diff_char_budget;
        }

        if other.plan.limit != default_limit() {
            self.plan.limit = other.plan.limit;
        }
        if other.plan.output != default_output() {
            self.plan.output = other.plan.output;
        }
    }

    /// Overlay environment variables; blank values are ignored
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = var("OPENAI_API_KEY") {
            self.suggest.api_key = Some(key);
        }
        if let Some(base) = var("OPENAI_API_BASE") {
            self.suggest.base_url = base;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.suggest.model = model;
        }
    }
}
