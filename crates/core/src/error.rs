//! Error types for the Slate core crate.

use thiserror::Error;

/// Top-level error type for all Slate core operations.
#[derive(Debug, Error)]
pub enum SlateError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("upstream authentication error: {0}")]
    UpstreamAuth(String),

    #[error("upstream API error ({status}): {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("sync error: {0}")]
    Sync(String),
}

impl SlateError {
    /// Create an upstream HTTP error from a status code and response body.
    pub fn upstream_http(status: u16, body: impl Into<String>) -> Self {
        Self::UpstreamHttp {
            status,
            body: body.into(),
        }
    }

    /// HTTP status if this is an upstream API error.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SlateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// A convenience Result alias that defaults to [`SlateError`].
pub type Result<T> = std::result::Result<T, SlateError>;
