//! Shared fixtures for knowledge base tests.

use crate::base::KnowledgeBase;
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::rag::ExtractiveAnswerModel;
use crate::store::{ChunkStore, SqliteStore};
use crate::types::{Chunk, ChunkId, KnowledgeBaseConfig, KnowledgeBaseStats};
use docqa_core::{AppError, AppResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_DIMENSION: usize = 384;

/// Base config with a zero threshold, so every neighbour is returned.
pub fn test_config(chunk_size: usize, chunk_overlap: usize) -> KnowledgeBaseConfig {
    KnowledgeBaseConfig {
        name: "test".to_string(),
        chunk_size,
        chunk_overlap,
        embedding_dimension: TEST_DIMENSION,
        similarity_threshold: 0.0,
        ..Default::default()
    }
}

pub fn trigram_embedder() -> Arc<Embedder> {
    embedder_with(Arc::new(TrigramProvider::new(TEST_DIMENSION)))
}

pub fn embedder_with(provider: Arc<dyn EmbeddingProvider>) -> Arc<Embedder> {
    Arc::new(Embedder::from_provider(provider, 8, Duration::from_secs(5)).unwrap())
}

/// A base over an in-memory store with the trigram embedder and the
/// extractive answer model.
pub fn memory_base(workspace: &Path, config: KnowledgeBaseConfig) -> KnowledgeBase {
    base_with_store(workspace, config, Arc::new(SqliteStore::open_in_memory(None).unwrap()))
}

pub fn base_with_store(
    workspace: &Path,
    config: KnowledgeBaseConfig,
    store: Arc<dyn ChunkStore>,
) -> KnowledgeBase {
    KnowledgeBase::with_parts(
        workspace,
        config,
        trigram_embedder(),
        store,
        Arc::new(ExtractiveAnswerModel),
    )
    .unwrap()
}

/// `n` distinct words.
pub fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
}

/// Trigram embeddings, except that texts containing "poison" fail.
#[derive(Debug)]
pub struct PoisonProvider {
    inner: TrigramProvider,
}

impl PoisonProvider {
    pub fn new() -> Self {
        Self {
            inner: TrigramProvider::new(TEST_DIMENSION),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for PoisonProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        TEST_DIMENSION
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("poison")) {
            return Err(AppError::Embedding("model rejected input".to_string()));
        }
        self.inner.embed_batch(texts).await
    }
}

/// Trigram embeddings after a delay, recording how many calls overlap.
#[derive(Debug)]
pub struct SlowProvider {
    inner: TrigramProvider,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: TrigramProvider::new(TEST_DIMENSION),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for SlowProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        TEST_DIMENSION
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Store whose writes can be switched off to simulate a failing disk.
#[derive(Debug)]
pub struct FailingStore {
    inner: SqliteStore,
    pub fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory(None).unwrap(),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(AppError::Store("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ChunkStore for FailingStore {
    fn persist(&self, chunks: &[Chunk]) -> AppResult<Vec<ChunkId>> {
        self.check()?;
        self.inner.persist(chunks)
    }

    fn load_all(&self) -> AppResult<Vec<Chunk>> {
        self.inner.load_all()
    }

    fn delete_all(&self) -> AppResult<()> {
        self.check()?;
        self.inner.delete_all()
    }

    fn count(&self) -> AppResult<usize> {
        self.inner.count()
    }

    fn stats(&self) -> AppResult<KnowledgeBaseStats> {
        self.inner.stats()
    }

    fn get_meta(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get_meta(key)
    }

    fn set_meta(&self, key: &str, value: &str) -> AppResult<()> {
        self.check()?;
        self.inner.set_meta(key, value)
    }
}
