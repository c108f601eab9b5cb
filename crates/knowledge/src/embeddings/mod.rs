//! Embedding engine for knowledge bases.
//!
//! [`Embedder`] wraps a loaded [`EmbeddingProvider`] and owns the rules every
//! vector entering the index must follow: fixed dimension, unit length, and
//! a bounded wait per batch.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{EmbeddingConfig, EmbeddingFingerprint};
pub use provider::{create_provider, EmbeddingProvider};

use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// A loaded embedding model. Construct once and share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    batch_size: usize,
    timeout: Duration,
}

impl Embedder {
    /// Load the provider named in `config`.
    ///
    /// # Errors
    /// `AppError::ModelLoad` when the provider cannot be created or reports a
    /// dimension other than the configured one.
    pub async fn load(config: &EmbeddingConfig) -> AppResult<Self> {
        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            dimensions = config.dimensions,
            "Loading embedding model"
        );

        let provider = create_provider(config).await.map_err(|e| match e {
            AppError::ModelLoad(_) => e,
            other => AppError::ModelLoad(other.to_string()),
        })?;

        if provider.dimensions() != config.dimensions {
            return Err(AppError::ModelLoad(format!(
                "Provider '{}' produces {} dimensions, configured {}",
                provider.provider_name(),
                provider.dimensions(),
                config.dimensions
            )));
        }

        Self::from_provider(provider, config.batch_size, config.timeout())
    }

    /// Wrap an already constructed provider.
    pub fn from_provider(
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::Config("batch_size must be greater than 0".to_string()));
        }

        Ok(Self {
            dimension: provider.dimensions(),
            provider,
            batch_size,
            timeout,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn fingerprint(&self) -> EmbeddingFingerprint {
        EmbeddingFingerprint {
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model_name().to_string(),
            dimensions: self.dimension,
        }
    }

    /// Embed texts in batches, returning one unit-length vector per text.
    ///
    /// Zero vectors (text without content) are returned as is.
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embedded = tokio::time::timeout(self.timeout, self.provider.embed_batch(batch))
                .await
                .map_err(|_| {
                    AppError::Embedding(format!(
                        "Embedding batch of {} texts timed out after {:?}",
                        batch.len(),
                        self.timeout
                    ))
                })?
                .map_err(|e| match e {
                    AppError::Embedding(_) => e,
                    other => AppError::Embedding(other.to_string()),
                })?;

            if embedded.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Provider returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }

            for mut vector in embedded {
                if vector.len() != self.dimension {
                    return Err(AppError::Embedding(format!(
                        "Expected {} dimensions, got {}",
                        self.dimension,
                        vector.len()
                    )));
                }
                normalize(&mut vector);
                vectors.push(vector);
            }
        }

        tracing::debug!(
            count = vectors.len(),
            provider = self.provider.provider_name(),
            "Embedded texts"
        );
        Ok(vectors)
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
