use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Validation error: invalid due date '{input}': {reason} (expected YYYY-MM-DD)")]
    DateParseError { input: String, reason: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Corrupt state in {}: {reason}", path.display())]
    CorruptStateError { path: PathBuf, reason: String },
    #[error("Store is locked: {} still held after {waited_ms}ms", path.display())]
    LockTimeoutError { path: PathBuf, waited_ms: u64 },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl OpsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptStateError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Bad input or a dangling reference, as opposed to a broken store.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::DateParseError { .. } | Self::NotFound(_)
        )
    }
}
