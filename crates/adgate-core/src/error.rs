//! Error types for Adgate

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single directory operation
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Startup and configuration errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config: {0}")]
    ConfigRead(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors reported by a directory backend
///
/// Variants that map to a definite HTTP status carry a status hint; the
/// others are reported as service-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Directory operation failed: {0}")]
    Backend(String),
}

impl DirectoryError {
    /// Error carrying an explicit HTTP status hint
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        DirectoryError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &str, name: &str) -> Self {
        DirectoryError::NotFound(format!("{} '{}'", kind, name))
    }

    pub fn already_exists(kind: &str, name: &str) -> Self {
        DirectoryError::AlreadyExists(format!("{} '{}'", kind, name))
    }

    pub fn status_hint(&self) -> Option<u16> {
        match self {
            DirectoryError::NotFound(_) => Some(404),
            DirectoryError::AlreadyExists(_) => Some(409),
            DirectoryError::InvalidInput(_) => Some(400),
            DirectoryError::AccessDenied(_) => Some(403),
            DirectoryError::Status { status, .. } => Some(*status),
            DirectoryError::Unavailable(_) | DirectoryError::Backend(_) => None,
        }
    }
}
