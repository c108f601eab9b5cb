//! Error types shared by every docqa crate.
//!
//! The variants follow the failure taxonomy of the retrieval pipeline:
//! model loading is fatal, embedding failures are per request, index
//! inconsistencies are detected at startup, ingestion failures are reported
//! per document and store failures are propagated to ingestion/reset callers.

use thiserror::Error;

/// Unified error type for docqa.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Generic knowledge base errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// The embedding model could not be loaded; no query can proceed.
    #[error("Model load failure: {0}")]
    ModelLoad(String),

    /// A single embedding call failed.
    #[error("Embedding failure: {0}")]
    Embedding(String),

    /// Store and in-memory index disagree.
    #[error("Index inconsistency: {0}")]
    IndexInconsistency(String),

    /// A document could not be ingested.
    #[error("Ingestion failure: {0}")]
    Ingestion(String),

    /// The persistence layer is unavailable or failed.
    #[error("Store failure: {0}")]
    Store(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error leaves the whole pipeline unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::ModelLoad(_) | AppError::Config(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AppError::ModelLoad("weights missing".into()).is_fatal());
        assert!(AppError::Config("bad overlap".into()).is_fatal());
        assert!(!AppError::Embedding("timeout".into()).is_fatal());
        assert!(!AppError::Store("disk full".into()).is_fatal());
    }

    #[test]
    fn test_display_includes_category() {
        let err = AppError::IndexInconsistency("3 vs 4".into());
        assert_eq!(err.to_string(), "Index inconsistency: 3 vs 4");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
