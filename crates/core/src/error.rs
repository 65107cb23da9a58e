//! Unified error types for menucache.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an unknown control message).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL or disallowed scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The partition was deleted before the write reached it.
    #[error("CACHE_RETIRED: {0}")]
    PartitionRetired(String),

    /// The network could not be reached.
    #[error("NETWORK_ERROR: {0}")]
    NetworkUnavailable(String),

    /// Lifecycle transition not allowed from the current state.
    #[error("LIFECYCLE_STATE: {0}")]
    InvalidState(String),

    /// Purge stopped short of deleting every partition.
    #[error("PURGE_INCOMPLETE: deleted {deleted}, failed {failed:?}")]
    PurgeIncomplete { deleted: usize, failed: Vec<String> },

    /// The HTTP client could not be constructed.
    #[error("HTTP_CLIENT: {0}")]
    HttpClient(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(format!("malformed JSON: {err}"))
    }
}

impl Error {
    /// Whether this failure came from the transport rather than storage or input.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::PartitionRetired(name) => (-32002, format!("partition {name} was deleted")),
            Error::NetworkUnavailable(msg) => (-32008, msg.clone()),
            Error::InvalidState(msg) => (-32013, msg.clone()),
            Error::PurgeIncomplete { .. } => (-32014, err.to_string()),
            Error::HttpClient(msg) => (-32000, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NetworkUnavailable("connection refused".to_string());
        assert!(err.to_string().contains("NETWORK_ERROR"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_purge_incomplete_display() {
        let err = Error::PurgeIncomplete { deleted: 1, failed: vec!["static-v2".to_string()] };
        let msg = err.to_string();
        assert!(msg.contains("PURGE_INCOMPLETE"));
        assert!(msg.contains("static-v2"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidState("not installed".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32013);
    }

    #[test]
    fn test_is_network() {
        assert!(Error::NetworkUnavailable("x".into()).is_network());
        assert!(!Error::PartitionRetired("static-v1".into()).is_network());
    }
}
