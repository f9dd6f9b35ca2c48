//! Error types for the Ollama client
//!
//! Every failure is surfaced to the immediate caller: as the result of a
//! unary call, or as the terminal item of a stream. Nothing is retried.

use futures_util::StreamExt;
use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Most bytes of a non-200 body kept for diagnostics
pub const ERROR_BODY_LIMIT: usize = 4096;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Server answered with a status other than 200
    #[error("Bad server response: HTTP {status}: {body}")]
    BadServerResponse { status: StatusCode, body: String },

    /// Response body or NDJSON line did not match the expected shape
    #[error("Decode error: {0}")]
    DecodeError(#[source] serde_json::Error),

    /// Request payload could not be serialized
    #[error("Encode error: {0}")]
    EncodeError(#[source] serde_json::Error),

    /// Network-level failure reported by the HTTP transport
    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    /// Streaming call abandoned by the caller
    #[error("Stream cancelled")]
    Cancelled,

    /// Host string does not form a valid base URL
    #[error("Invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },
}

impl ClientError {
    /// True if this error marks a caller-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Status code carried by a `BadServerResponse`
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::BadServerResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Build a `BadServerResponse` from a non-200 response
///
/// Only the first body chunk is awaited, capped at `ERROR_BODY_LIMIT`, so a
/// server that stalls mid-body cannot hold the error back.
pub(crate) async fn bad_server_response(response: Response) -> ClientError {
    let status = response.status();
    let mut chunks = Box::pin(response.bytes_stream());

    let body = match chunks.next().await {
        Some(Ok(chunk)) => {
            let end = chunk.len().min(ERROR_BODY_LIMIT);
            String::from_utf8_lossy(&chunk[..end]).into_owned()
        }
        _ => String::new(),
    };

    ClientError::BadServerResponse { status, body }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_server_response_display() {
        let err = ClientError::BadServerResponse {
            status: StatusCode::NOT_FOUND,
            body: "model 'foo' not found".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("model 'foo' not found"));
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_decode_error_display() {
        let inner = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ClientError::DecodeError(inner);
        assert!(err.to_string().starts_with("Decode error"));
        assert!(err.status().is_none());
    }

    #[test]
    fn test_cancelled() {
        assert!(ClientError::Cancelled.is_cancelled());
        assert!(!ClientError::InvalidHost {
            host: "x".to_string(),
            reason: "y".to_string(),
        }
        .is_cancelled());
    }

    #[test]
    fn test_invalid_host_display() {
        let err = ClientError::InvalidHost {
            host: "bad host".to_string(),
            reason: "invalid domain character".to_string(),
        };
        assert!(err.to_string().contains("bad host"));
        assert!(err.to_string().contains("invalid domain character"));
    }
}
