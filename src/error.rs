//! Error types for tempshare.

use thiserror::Error;

/// Common error type for tempshare.
#[derive(Error, Debug)]
pub enum ShareError {
    /// Database error.
    ///
    /// Errors from sqlx are converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found (unknown ID, expired record, or missing backing object).
    #[error("{0} not found")]
    NotFound(String),

    /// A client-supplied path was rejected by the sanitizer.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A Range header could not be satisfied for the given object size.
    #[error("range not satisfiable (size {size})")]
    InvalidRange {
        /// Total size of the object the range was resolved against.
        size: u64,
    },

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ShareError {
    fn from(e: sqlx::Error) -> Self {
        ShareError::Database(e.to_string())
    }
}

/// Result type alias for tempshare operations.
pub type Result<T> = std::result::Result<T, ShareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = ShareError::NotFound("file 42".to_string());
        assert_eq!(err.to_string(), "file 42 not found");
    }

    #[test]
    fn test_invalid_range_display() {
        let err = ShareError::InvalidRange { size: 1024 };
        assert_eq!(err.to_string(), "range not satisfiable (size 1024)");
    }

    #[test]
    fn test_invalid_path_display() {
        let err = ShareError::InvalidPath("../etc/passwd".to_string());
        assert_eq!(err.to_string(), "invalid path: ../etc/passwd");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShareError = io_err.into();
        assert!(matches!(err, ShareError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: ShareError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ShareError::Database(_)));
    }
}
