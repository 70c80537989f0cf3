use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoteboxError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Slow down! Rate limit reached, try again later.")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl NoteboxError {
    /// Whether the same request may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NoteboxError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, NoteboxError>;
