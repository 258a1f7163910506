//! Error types for the tutor client.

/// Errors from the backend exchange, session storage and configuration.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TutorError>;
