//! # Client Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Response            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidUrl     │  │  Connection     │  │  Http (non-2xx)         │ │
//! │  │                 │  │  Timeout        │  │  NotFound (404)         │ │
//! │  │                 │  │                 │  │  Decode                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for backend calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Backend call failures.
///
/// Variants hold strings rather than the underlying `reqwest` errors so the
/// error is `Clone`: one failed checkout result is handed to every caller
/// awaiting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Base URL or endpoint path does not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A configured default header is not valid HTTP.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The server could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// No response within the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Http { status: u16, body: String },

    /// The requested resource does not exist (HTTP 404).
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl ClientError {
    /// Returns true if repeating the same request may succeed.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - 5xx responses and 429
    ///
    /// ## Non-Retryable Errors
    /// - Bad configuration
    /// - 4xx responses (the request itself is wrong)
    /// - Malformed responses
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Connection(_) | ClientError::Timeout(_) => true,
            ClientError::Http { status, .. } => *status >= 500 || *status == 429,
            ClientError::InvalidUrl(_)
            | ClientError::InvalidHeader { .. }
            | ClientError::NotFound { .. }
            | ClientError::Decode(_) => false,
        }
    }

    /// Returns true if the error points at the register's configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidUrl(_) | ClientError::InvalidHeader { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ClientError::Connection("refused".into()).is_retryable());
        assert!(ClientError::Timeout(10).is_retryable());
        assert!(ClientError::Http { status: 503, body: String::new() }.is_retryable());
        assert!(ClientError::Http { status: 429, body: String::new() }.is_retryable());

        assert!(!ClientError::Http { status: 400, body: String::new() }.is_retryable());
        assert!(!ClientError::Decode("missing id".into()).is_retryable());
        assert!(!ClientError::InvalidUrl("x".into()).is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(ClientError::InvalidUrl("x".into()).is_config_error());
        assert!(!ClientError::Timeout(5).is_config_error());
        assert!(ClientError::InvalidHeader {
            name: "X Bad".into(),
            reason: "invalid".into()
        }
        .is_config_error());
    }
}
