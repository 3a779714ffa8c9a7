//! Error types for chess-copilot operations.
//!
//! This module provides the error hierarchy using `thiserror` for storage,
//! hosted-service calls, streaming, I/O, and CLI commands.

use thiserror::Error;

/// Result type alias for chess-copilot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors (session database).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Hosted service errors (agent, analyst, search, completion).
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Storage-specific errors for the session database.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Storage not initialized (init command not run).
    #[error("session store not initialized. Run: chess-copilot init")]
    NotInitialized,

    /// Session not found.
    #[error("session not found: {id}")]
    SessionNotFound {
        /// Session identifier that was not found.
        id: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while talking to a hosted service.
///
/// `TransportRejected` and `StreamInterrupted` are terminal for a request.
/// `MalformedPayload` only ever describes a single skipped event.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service answered with an error status instead of a result.
    #[error("HTTP {status} (request_id={}): {body}", request_id.as_deref().unwrap_or("-"))]
    TransportRejected {
        /// HTTP status code.
        status: u16,
        /// Correlation id from the `X-Snowflake-Request-Id` header.
        request_id: Option<String>,
        /// Response body, decoded lossily.
        body: String,
    },

    /// The response stream ended abnormally after streaming began.
    #[error("stream interrupted: {reason}")]
    StreamInterrupted {
        /// Transport error description.
        reason: String,
    },

    /// An event payload did not match the structure for its event type.
    #[error("malformed payload for event {event}: {reason}")]
    MalformedPayload {
        /// Event name (`message` for unnamed events).
        event: String,
        /// Parse failure description.
        reason: String,
    },

    /// The request could not be built or sent (no status received).
    #[error("request failed: {0}")]
    Request(String),

    /// A statement was still running when the request timeout elapsed.
    #[error("statement {handle} still running after the request timeout")]
    StatementTimeout {
        /// Server handle of the running statement.
        handle: String,
    },

    /// A non-streamed success body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// I/O-specific errors.
#[derive(Error, Debug)]
pub enum IoError {
    /// Failed to write output.
    #[error("failed to write output: {reason}")]
    WriteFailed {
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Service(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: Error = IoError::WriteFailed {
            reason: "disk full".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "I/O error: failed to write output: disk full"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotInitialized;
        assert_eq!(
            err.to_string(),
            "session store not initialized. Run: chess-copilot init"
        );

        let err = StorageError::SessionNotFound {
            id: "default".to_string(),
        };
        assert_eq!(err.to_string(), "session not found: default");
    }

    #[test]
    fn test_transport_rejected_display() {
        let err = ServiceError::TransportRejected {
            status: 500,
            request_id: Some("abc-123".to_string()),
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500 (request_id=abc-123): boom");

        let err = ServiceError::TransportRejected {
            status: 401,
            request_id: None,
            body: String::new(),
        };
        assert!(err.to_string().contains("request_id=-"));
    }

    #[test]
    fn test_stream_error_display() {
        let malformed = ServiceError::MalformedPayload {
            event: "response".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(
            malformed.to_string(),
            "malformed payload for event response: expected value"
        );

        let interrupted = ServiceError::StreamInterrupted {
            reason: "connection reset".to_string(),
        };
        assert!(interrupted.to_string().contains("connection reset"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_service() {
        let err: Error = ServiceError::Request("dns".to_string()).into();
        assert!(matches!(err, Error::Service(ServiceError::Request(_))));
        assert_eq!(err.to_string(), "service error: request failed: dns");
    }

    #[test]
    fn test_error_config() {
        let err = Error::Config {
            message: "missing host".to_string(),
        };
        assert_eq!(err.to_string(), "configuration error: missing host");
    }

    #[test]
    fn test_command_error_variants() {
        let err = CommandError::InvalidArgument("--limit".to_string());
        assert!(err.to_string().contains("invalid argument"));

        let err = CommandError::ExecutionFailed("timeout".to_string());
        assert!(err.to_string().contains("execution failed"));
    }

    #[test]
    fn test_from_rusqlite_error_to_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    fn test_from_serde_json_error_to_storage_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
