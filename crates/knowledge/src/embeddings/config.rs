//! Embedding configuration and the fingerprint recorded next to stored vectors.

use crate::types::KnowledgeBaseConfig;
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding settings extracted from a knowledge base config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum texts per provider call
    pub batch_size: usize,

    /// Endpoint for HTTP providers
    pub endpoint: Option<String>,

    /// Per-batch timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from_base(&KnowledgeBaseConfig::default())
    }
}

impl EmbeddingConfig {
    pub fn from_base(config: &KnowledgeBaseConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            dimensions: config.embedding_dimension,
            batch_size: config.batch_size,
            endpoint: config.embedding_endpoint.clone(),
            timeout_secs: config.embed_timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn fingerprint(&self) -> EmbeddingFingerprint {
        EmbeddingFingerprint {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
        }
    }
}

/// Identity of the model that produced a set of vectors.
///
/// Vectors from different fingerprints are not comparable, so a store only
/// ever holds vectors of one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingFingerprint {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingFingerprint {
    /// Check that vectors stored under `stored` can be searched with `self`.
    pub fn validate_consistency(&self, stored: &Self) -> AppResult<()> {
        if self == stored {
            return Ok(());
        }

        Err(AppError::IndexInconsistency(format!(
            "Stored vectors were produced by {}/{} ({} dims) but the current model is {}/{} ({} dims). \
             Run 'docqa knowledge reset' and ingest the documents again.",
            stored.provider,
            stored.model,
            stored.dimensions,
            self.provider,
            self.model,
            self.dimensions
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_base_copies_embedding_fields() {
        let base = KnowledgeBaseConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            embedding_dimension: 768,
            embedding_endpoint: Some("http://gpu:11434".to_string()),
            ..Default::default()
        };

        let config = EmbeddingConfig::from_base(&base);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu:11434"));
    }

    #[test]
    fn test_validate_consistency_success() {
        let fingerprint = EmbeddingConfig::default().fingerprint();
        assert!(fingerprint.validate_consistency(&fingerprint.clone()).is_ok());
    }

    #[test]
    fn test_validate_consistency_model_mismatch() {
        let current = EmbeddingConfig::default().fingerprint();
        let stored = EmbeddingFingerprint {
            model: "trigram-v0".to_string(),
            ..current.clone()
        };

        let err = current.validate_consistency(&stored).unwrap_err();
        assert!(matches!(err, AppError::IndexInconsistency(_)));
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let current = EmbeddingConfig::default().fingerprint();
        let stored = EmbeddingFingerprint {
            dimensions: 768,
            ..current.clone()
        };

        assert!(current.validate_consistency(&stored).is_err());
    }
}
