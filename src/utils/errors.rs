use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot resolve '{specifier}' from {}", .base.display())]
    Resolution { specifier: String, base: PathBuf },

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("stylesheet error in {}: {message}", .file.display())]
    Stylesheet { file: PathBuf, message: String },

    #[error("source map error: {0}")]
    SourceMap(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("build error: {0}")]
    Build(String),
}

impl TabaError {
    /// Create a simple build error
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    /// Create an integrity error (a logic bug, never user-recoverable)
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TabaError>;

impl From<serde_json::Error> for TabaError {
    fn from(err: serde_json::Error) -> Self {
        TabaError::Build(format!("serialization error: {}", err))
    }
}

impl From<notify::Error> for TabaError {
    fn from(err: notify::Error) -> Self {
        TabaError::Watch(err.to_string())
    }
}
