//! Error types for meshloop
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in meshloop
#[derive(Debug, Error)]
pub enum MeshloopError {
    /// Operation not permitted in the runner's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Worker thread could not be created
    #[error("Failed to spawn loop thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Worker thread could not be joined
    #[error("Failed to join loop thread: {0}")]
    Join(String),

    /// Event loop runtime could not be built
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Posture query could not be answered
    #[error("Posture error: {0}")]
    Posture(String),

    /// Diagnostic dump failed
    #[error("Dump error: {0}")]
    Dump(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for meshloop operations
pub type Result<T> = std::result::Result<T, MeshloopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_error() {
        let err = MeshloopError::InvalidState("loop is not running".to_string());
        assert_eq!(err.to_string(), "Invalid state: loop is not running");
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads left");
        let err = MeshloopError::Spawn(io_err);
        assert_eq!(err.to_string(), "Failed to spawn loop thread: no threads left");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_join_error() {
        let err = MeshloopError::Join("worker panicked".to_string());
        assert_eq!(err.to_string(), "Failed to join loop thread: worker panicked");
    }

    #[test]
    fn test_posture_error() {
        let err = MeshloopError::Posture("provider dropped".to_string());
        assert_eq!(err.to_string(), "Posture error: provider dropped");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MeshloopError = io_err.into();
        assert!(matches!(err, MeshloopError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: MeshloopError = json_err.into();
        assert!(matches!(err, MeshloopError::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(MeshloopError::InvalidState("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
