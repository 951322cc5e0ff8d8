//! Suggestion service error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Failure of one suggestion call. Every variant aborts the planning run.
#[derive(Debug, Clone, Error)]
pub enum SuggestError {
    /// The per-call deadline elapsed
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Rate limited by the provider
    #[error("rate limited: {message}")]
    RateLimit { message: String },

    /// Credential rejected
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Transport failure or server-side error
    #[error("network error: {message}")]
    Network { message: String },

    /// Request rejected by the service
    #[error("request rejected: {message}")]
    Request { message: String },

    /// Response body could not be decoded
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Nothing usable in the response
    #[error("empty response")]
    EmptyResponse,

    /// Prompt could not be rendered
    #[error("prompt error: {message}")]
    Prompt { message: String },
}

impl SuggestError {
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}
