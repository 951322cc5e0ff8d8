//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Problems assembling the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No credential for the suggestion service
    #[error("{variable} is not set (export it or set api_key under [suggest] in the config file)")]
    MissingCredential { variable: &'static str },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
