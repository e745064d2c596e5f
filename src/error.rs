//! Error types for Gjort.

use thiserror::Error;

/// Library-level error type for Gjort operations.
#[derive(Error, Debug)]
pub enum GjortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Model API error: {0}")]
    Model(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Gjort operations.
pub type Result<T> = std::result::Result<T, GjortError>;
