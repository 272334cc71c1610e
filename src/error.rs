//! Error types for newswire.

use thiserror::Error;

/// Common error type for newswire.
#[derive(Error, Debug)]
pub enum NewswireError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant. A failed store
    /// transaction always surfaces here and aborts the cycle.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Remote fetch error (feed, channel, article page).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Push notification send error.
    #[error("notification error: {0}")]
    Notify(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for NewswireError {
    fn from(e: sqlx::Error) -> Self {
        NewswireError::Database(e.to_string())
    }
}

/// Result type alias for newswire operations.
pub type Result<T> = std::result::Result<T, NewswireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = NewswireError::Validation("item has no discriminator".to_string());
        assert_eq!(err.to_string(), "validation error: item has no discriminator");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = NewswireError::NotFound("notification state".to_string());
        assert_eq!(err.to_string(), "notification state not found");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = NewswireError::Fetch("HTTP error: 503".to_string());
        assert_eq!(err.to_string(), "fetch error: HTTP error: 503");
    }

    #[test]
    fn test_notify_error_display() {
        let err = NewswireError::Notify("topic rejected".to_string());
        assert_eq!(err.to_string(), "notification error: topic rejected");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: NewswireError = io_err.into();
        assert!(matches!(err, NewswireError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: NewswireError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, NewswireError::Database(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(NewswireError::Config("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
