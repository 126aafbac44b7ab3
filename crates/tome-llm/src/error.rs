//! Error types for the generation service client.

use tome_core::error::TomeError;

/// Errors from the generation service transport.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<LlmError> for TomeError {
    fn from(err: LlmError) -> Self {
        TomeError::Generation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Authentication("bad key".to_string());
        assert_eq!(err.to_string(), "authentication failed: bad key");

        let err = LlmError::RateLimited;
        assert_eq!(err.to_string(), "rate limit exceeded");

        let err = LlmError::Api {
            status: 500,
            message: "server error".to_string(),
        };
        assert_eq!(err.to_string(), "API error (500): server error");
    }

    #[test]
    fn test_conversion_to_tome_error() {
        let err = LlmError::Network("connection reset".to_string());
        let tome_err: TomeError = err.into();
        assert!(matches!(tome_err, TomeError::Generation(_)));
        assert!(tome_err.to_string().contains("connection reset"));
    }
}
