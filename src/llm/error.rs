//! Errors raised at the text-generation boundary
//!
//! This module defines BackendError for LLM client error handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur during backend operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or credentials are invalid
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded, retry after the specified duration (in seconds)
    RateLimitError { retry_after: Option<u64> },

    /// Invalid or malformed response from the LLM
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Configuration error (missing API keys, invalid settings, etc.)
    ConfigurationError { message: String },

    /// Network-related error
    NetworkError { message: String },

    /// Generic error for other cases
    Other { message: String },
}

impl BackendError {
    /// Returns true if a repeated call has a chance of succeeding
    ///
    /// Caller-side failures (credentials, configuration, 4xx other than 408/429)
    /// are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::ApiError { status_code, .. } => match status_code {
                None => true,
                Some(code) => *code >= 500 || *code == 408 || *code == 429,
            },
            BackendError::TimeoutError { .. }
            | BackendError::RateLimitError { .. }
            | BackendError::NetworkError { .. }
            | BackendError::InvalidResponse { .. } => true,
            BackendError::AuthenticationError { .. }
            | BackendError::ConfigurationError { .. }
            | BackendError::Other { .. } => false,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::AuthenticationError { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::RateLimitError { retry_after } => {
                if let Some(seconds) = retry_after {
                    write!(f, "Rate limit exceeded, retry after {} seconds", seconds)
                } else {
                    write!(f, "Rate limit exceeded")
                }
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from LLM: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::TimeoutError { seconds: 30 }.is_transient());
        assert!(BackendError::RateLimitError { retry_after: None }.is_transient());
        assert!(BackendError::NetworkError {
            message: "connection reset".to_string()
        }
        .is_transient());
        assert!(BackendError::ApiError {
            message: "overloaded".to_string(),
            status_code: Some(529),
        }
        .is_transient());
        assert!(BackendError::ApiError {
            message: "request failed".to_string(),
            status_code: None,
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!BackendError::AuthenticationError {
            message: "bad key".to_string()
        }
        .is_transient());
        assert!(!BackendError::ConfigurationError {
            message: "missing model".to_string()
        }
        .is_transient());
        assert!(!BackendError::ApiError {
            message: "bad request".to_string(),
            status_code: Some(400),
        }
        .is_transient());
    }

    #[test]
    fn test_display() {
        let err = BackendError::ApiError {
            message: "boom".to_string(),
            status_code: Some(502),
        };
        assert_eq!(err.to_string(), "API error (502): boom");
        assert_eq!(
            BackendError::TimeoutError { seconds: 5 }.to_string(),
            "Request timed out after 5 seconds"
        );
    }
}
