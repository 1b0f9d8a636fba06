//! Error types for the export engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while orchestrating exports or imports.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Queue, cursor, or registry failure.
    #[error("core error: {0}")]
    Core(#[from] marketsync_core::CoreError),

    /// Marketplace API failure.
    #[error("api error: {0}")]
    Api(#[from] marketsync_api::ApiError),

    /// Host-store failure (snapshot read or order create).
    #[error("host store error: {message}")]
    Host {
        /// Description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Creates a host-store error.
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Returns true if the operation that failed can be retried.
    ///
    /// API errors carry their own classification. Host-store failures are
    /// treated as transient (the host is local and recovers). Core errors
    /// are infrastructural and not retried blindly.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_retryable(),
            Self::Host { .. } => true,
            Self::Core(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketsync_api::ApiError;

    #[test]
    fn retryability_follows_the_source() {
        assert!(EngineError::from(ApiError::Timeout).is_retryable());
        assert!(!EngineError::from(ApiError::Authentication("bad".into())).is_retryable());
        assert!(EngineError::host("disk hiccup").is_retryable());
    }
}
