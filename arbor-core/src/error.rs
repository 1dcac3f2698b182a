use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Failed to resolve {}: {reason}", path.display())]
    Resolution { path: PathBuf, reason: String },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("A library scan is already running")]
    ScanInProgress,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LibraryError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        LibraryError::InvalidArgument(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LibraryError::Cancelled(_))
    }

    /// True for I/O errors meaning "the path is already gone".
    pub fn is_not_found(&self) -> bool {
        match self {
            LibraryError::Io(err) => {
                err.kind() == std::io::ErrorKind::NotFound
            }
            LibraryError::NotFound(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
