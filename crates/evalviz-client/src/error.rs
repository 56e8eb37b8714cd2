//! Error types for the collaborator client.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    /// Exit code for CLI: lookup and transport failures are 1, configuration 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::NotFound { .. }
            | Self::Unauthorized { .. }
            | Self::RateLimited { .. }
            | Self::Network { .. }
            | Self::InvalidResponse { .. }
            | Self::Io { .. } => 1,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
