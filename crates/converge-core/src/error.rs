//! Error types for the converge system
//!
//! Every outcome of a wait or a reconciliation that is not success is one of
//! these variants. Callers tell a timeout from a cancellation from a remote
//! failure by matching on the variant (or with the `is_*` predicates).

use thiserror::Error;

/// Result type alias for converge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when a wait times out without a configured message
pub const DEFAULT_TIMEOUT_MESSAGE: &str = "timed out waiting for condition";

/// Core error type for the converge system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (invalid wait spec, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The wait deadline expired before the condition was satisfied
    #[error("{0}")]
    Timeout(String),

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// The remote entity reached a terminal failure state
    #[error("{entity} failed: {message}")]
    RemoteFailure {
        /// Entity that failed (e.g. "operation", "addon ad-123")
        entity: String,
        /// Error detail reported by the remote
        message: String,
    },

    /// Entity not found on the remote
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Collaborator-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a remote terminal-failure error
    pub fn remote_failure(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// True if the wait deadline expired
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// True if the caller cancelled the operation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True if the remote reported the entity as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True if the remote reported a terminal failure state
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::RemoteFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_kinds_are_distinct() {
        let timeout = Error::timeout(DEFAULT_TIMEOUT_MESSAGE);
        let failure = Error::remote_failure("operation", "boom");

        assert!(timeout.is_timeout());
        assert!(!timeout.is_cancelled());
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Cancelled.is_timeout());
        assert!(failure.is_remote_failure());
        assert!(Error::not_found("db").is_not_found());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::timeout("restart operation timeout").to_string(),
            "restart operation timeout"
        );
        assert_eq!(
            Error::remote_failure("operation op-1", "disk full").to_string(),
            "operation op-1 failed: disk full"
        );
    }
}
