//! Error types for marketplace API calls.

use thiserror::Error;

/// Result type for marketplace API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while calling the marketplace API.
///
/// Classification drives the queue retry policy: retryable errors return
/// claimed entries to pending (bounded by the attempt ceiling), while
/// non-retryable errors fail them terminally.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the call can be retried.
        retryable: bool,
    },

    /// The call exceeded its per-call timeout.
    #[error("marketplace call timed out")]
    Timeout,

    /// The marketplace rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The marketplace reported a server-side failure.
    #[error("marketplace server error: {0}")]
    Server(String),

    /// The response could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ApiError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the failed call can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Timeout => true,
            Self::Server(_) => true,
            Self::Authentication(_) | Self::Protocol(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ApiError::transport_retryable("connection reset").is_retryable());
        assert!(!ApiError::transport_fatal("bad certificate").is_retryable());
        assert!(ApiError::Timeout.is_retryable());
        assert!(ApiError::Server("internal error".into()).is_retryable());
        assert!(!ApiError::Authentication("bad key".into()).is_retryable());
        assert!(!ApiError::Protocol("unexpected body".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = ApiError::Timeout;
        assert_eq!(err.to_string(), "marketplace call timed out");

        let err = ApiError::transport_retryable("connection refused");
        assert!(err.to_string().contains("connection refused"));
    }
}
