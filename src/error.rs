//! Error types for ibqueue
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in ibqueue
#[derive(Debug, Error)]
pub enum IbqError {
    /// Beta shape parameters must be finite and strictly positive
    #[error("Invalid priority parameters: a={a}, b={b}")]
    InvalidParameter { a: f64, b: f64 },

    /// The external item source failed while answering a due-items query
    #[error("Query source failed: {0}")]
    QuerySource(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Item not present in the store
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for ibqueue operations
pub type Result<T> = std::result::Result<T, IbqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_error() {
        let err = IbqError::InvalidParameter { a: 0.0, b: 1.5 };
        assert_eq!(err.to_string(), "Invalid priority parameters: a=0, b=1.5");
    }

    #[test]
    fn test_query_source_error() {
        let err = IbqError::QuerySource("timed out".to_string());
        assert_eq!(err.to_string(), "Query source failed: timed out");
    }

    #[test]
    fn test_storage_error() {
        let err = IbqError::Storage("file locked".to_string());
        assert_eq!(err.to_string(), "Storage error: file locked");
    }

    #[test]
    fn test_item_not_found_error() {
        let err = IbqError::ItemNotFound("66a1-block".to_string());
        assert_eq!(err.to_string(), "Item not found: 66a1-block");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IbqError = io_err.into();
        assert!(matches!(err, IbqError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: IbqError = json_err.into();
        assert!(matches!(err, IbqError::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(IbqError::QuerySource("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
