//! Error types for ingestion and retrieval.

use std::path::PathBuf;

use tome_core::error::TomeError;

/// Errors from the retrieval subsystem.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("unsupported document type: {0}")]
    UnsupportedInput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index error: {0}")]
    Index(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<RetrievalError> for TomeError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::UnsupportedInput(_) | RetrievalError::Io(_) => {
                TomeError::Ingest(err.to_string())
            }
            RetrievalError::Index(_) | RetrievalError::Persistence(_) => {
                TomeError::Index(err.to_string())
            }
            RetrievalError::Embedding(_) => TomeError::Search(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_input_display() {
        let err = RetrievalError::UnsupportedInput(PathBuf::from("report.pdf"));
        assert_eq!(err.to_string(), "unsupported document type: report.pdf");
    }

    #[test]
    fn test_conversion_to_tome_error() {
        let err = RetrievalError::UnsupportedInput(PathBuf::from("a.bin"));
        let tome_err: TomeError = err.into();
        assert!(matches!(tome_err, TomeError::Ingest(_)));

        let err = RetrievalError::Index("dimension mismatch".to_string());
        let tome_err: TomeError = err.into();
        assert!(matches!(tome_err, TomeError::Index(_)));
    }
}
