//! Error types for the RAG engine

use std::time::Duration;

use thiserror::Error;

use crate::corpus::CorpusState;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG engine errors
#[derive(Debug, Error)]
pub enum Error {
    /// Document is not a well-formed instance of its declared format
    #[error("Failed to extract text from '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// No extractor is registered for the file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Invalid configuration or call parameters
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text could not be embedded
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Query vector and index disagree on dimension
    #[error("Dimension mismatch: index has {expected} dimensions, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Answer model invocation failed
    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    /// Query against a corpus with no published index
    #[error("Corpus is not ready for queries (state: {state})")]
    NotReady { state: CorpusState },

    /// Operation exceeded its time bound
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout { operation: String, after: Duration },

    /// Operation was abandoned before completion
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a synthesis error
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis(message.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Synthesis(_) => true,
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Short machine-readable label for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Extraction { .. } => "extraction_error",
            Error::UnsupportedFileType(_) => "unsupported_type",
            Error::Config(_) => "config_error",
            Error::Embedding(_) => "embedding_error",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::Synthesis(_) => "synthesis_error",
            Error::NotReady { .. } => "not_ready",
            Error::Timeout { .. } => "timeout",
            Error::Cancelled(_) => "cancelled",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Toml(_) => "toml_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinct_and_retryable() {
        let err = Error::timeout("ask", Duration::from_millis(250));
        assert_eq!(err.kind(), "timeout");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "ask timed out after 250ms");

        let err = Error::extraction("a.pdf", "bad xref");
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "extraction_error");
    }

    #[test]
    fn test_not_ready_mentions_state() {
        let err = Error::NotReady { state: CorpusState::Empty };
        assert!(err.to_string().contains("empty"));
    }
}
