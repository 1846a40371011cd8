use thiserror::Error;

/// Errors raised by the sync layer (server and client side).
#[derive(Debug, Error)]
pub enum SyncError {
    /// No identity token available; the channel is never attempted.
    #[error("missing identity credential")]
    MissingCredential,

    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("persistence call failed: {0}")]
    Persistence(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Protocol(e.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(e: url::ParseError) -> Self {
        SyncError::InvalidUrl(e.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Persistence(e.to_string())
    }
}
