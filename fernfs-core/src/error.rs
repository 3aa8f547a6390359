//! Error types for fernfs

use std::io;
use thiserror::Error;

/// Result type alias
pub type FernResult<T> = Result<T, FernError>;

/// Main error type
#[derive(Error, Debug)]
pub enum FernError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl FernError {
    /// Classify an I/O error raised while operating on `path`.
    ///
    /// Kinds with a dedicated variant keep the logical path as their message;
    /// anything else is carried through unchanged as [`FernError::Io`].
    pub fn from_io(err: io::Error, path: impl Into<String>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => FernError::NotFound(path),
            io::ErrorKind::AlreadyExists => FernError::AlreadyExists(path),
            io::ErrorKind::PermissionDenied => FernError::PermissionDenied(path),
            io::ErrorKind::NotADirectory => FernError::NotADirectory(path),
            io::ErrorKind::IsADirectory => FernError::IsADirectory(path),
            io::ErrorKind::DirectoryNotEmpty => FernError::DirectoryNotEmpty(path),
            _ => FernError::Io(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FernError::NotFound(_) => true,
            FernError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Caller-side input problems, as opposed to backend failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FernError::InvalidPath(_) | FernError::InvalidRange(_) | FernError::InvalidMode(_)
        )
    }

    /// HTTP status an API boundary should answer with for this error.
    pub fn http_status(&self) -> u16 {
        if self.is_not_found() {
            404
        } else if self.is_client_error() {
            400
        } else {
            500
        }
    }
}
