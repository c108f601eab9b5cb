//! Explicitly constructed retrieval handles.
//!
//! A [`RetrievalContext`] bundles the loaded embedder, the store, and the
//! currently published index snapshot. Writers build a new snapshot off to
//! the side and publish it with a single pointer swap, so a concurrent search
//! sees either the old or the new snapshot in full.

use crate::embeddings::{Embedder, EmbeddingFingerprint};
use crate::store::{ChunkStore, META_EMBEDDING_FINGERPRINT};
use crate::types::{Chunk, ChunkId, ChunkPayload};
use crate::vector_index::{FlatIndex, Metric, VectorIndex};
use docqa_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Immutable view of the index plus the payloads needed to build results.
#[derive(Debug)]
pub struct IndexSnapshot {
    pub index: Box<dyn VectorIndex>,
    pub payloads: HashMap<ChunkId, ChunkPayload>,
}

impl IndexSnapshot {
    pub fn empty(dimension: usize, metric: Metric) -> Self {
        Self {
            index: Box::new(FlatIndex::new(dimension, metric)),
            payloads: HashMap::new(),
        }
    }

    /// Build a snapshot holding exactly `chunks`.
    pub fn from_chunks(dimension: usize, metric: Metric, chunks: Vec<Chunk>) -> AppResult<Self> {
        let mut snapshot = Self::empty(dimension, metric);
        let mut entries = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            snapshot.payloads.insert(chunk.id.clone(), chunk.payload());
            entries.push((chunk.id, chunk.vector));
        }

        snapshot.index.rebuild_from(entries)?;
        Ok(snapshot)
    }

    /// A copy with `removed` dropped and `chunks` upserted.
    pub fn with_changes(&self, chunks: &[Chunk], removed: &[ChunkId]) -> AppResult<Self> {
        let mut index = self.index.boxed_clone();
        let mut payloads = self.payloads.clone();

        index.remove(removed);
        for id in removed {
            payloads.remove(id);
        }

        let ids: Vec<ChunkId> = chunks.iter().map(|c| c.id.clone()).collect();
        let vectors: Vec<Vec<f32>> = chunks.iter().map(|c| c.vector.clone()).collect();
        index.add(&vectors, &ids)?;
        for chunk in chunks {
            payloads.insert(chunk.id.clone(), chunk.payload());
        }

        Ok(Self { index, payloads })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Embedder, store and index snapshot for one knowledge base.
#[derive(Debug)]
pub struct RetrievalContext {
    embedder: Arc<Embedder>,
    store: Arc<dyn ChunkStore>,
    metric: Metric,
    snapshot: RwLock<Arc<IndexSnapshot>>,
}

impl RetrievalContext {
    /// Create a context and load the index from the store.
    ///
    /// # Errors
    /// `AppError::IndexInconsistency` when the store holds vectors of another
    /// embedding model, or when the rebuilt index keeps disagreeing with the
    /// store's chunk count.
    pub fn open(
        embedder: Arc<Embedder>,
        store: Arc<dyn ChunkStore>,
        metric: Metric,
    ) -> AppResult<Self> {
        let context = Self {
            snapshot: RwLock::new(Arc::new(IndexSnapshot::empty(embedder.dimension(), metric))),
            embedder,
            store,
            metric,
        };

        context.check_fingerprint()?;
        context.reload_from_store()?;
        Ok(context)
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn store(&self) -> &dyn ChunkStore {
        self.store.as_ref()
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: IndexSnapshot) {
        let mut guard = self.snapshot.write().unwrap_or_else(|p| p.into_inner());
        *guard = Arc::new(snapshot);
    }

    /// Rebuild the index from `load_all` and publish it.
    ///
    /// The entry count is checked against the store; on mismatch the rebuild
    /// is repeated once from a fresh load before giving up.
    pub fn reload_from_store(&self) -> AppResult<()> {
        for attempt in 1..=2 {
            let chunks = self.store.load_all()?;
            let snapshot =
                IndexSnapshot::from_chunks(self.embedder.dimension(), self.metric, chunks)?;
            let stored = self.store.count()?;

            if snapshot.len() == stored {
                tracing::info!(chunks = stored, "Loaded index from store");
                self.publish(snapshot);
                return Ok(());
            }

            tracing::warn!(
                attempt,
                indexed = snapshot.len(),
                stored,
                "Index does not match store, rebuilding"
            );
        }

        Err(AppError::IndexInconsistency(
            "Index entry count does not match the store after rebuild".to_string(),
        ))
    }

    /// Record the embedder fingerprint in an empty store, or check that a
    /// non-empty store was built with the same model.
    pub fn check_fingerprint(&self) -> AppResult<()> {
        let current = self.embedder.fingerprint();

        match self.store.get_meta(META_EMBEDDING_FINGERPRINT)? {
            Some(raw) => {
                let stored: EmbeddingFingerprint = serde_json::from_str(&raw).map_err(|e| {
                    AppError::IndexInconsistency(format!("Unreadable embedding fingerprint: {}", e))
                })?;
                current.validate_consistency(&stored)
            }
            None if self.store.count()? > 0 => Err(AppError::IndexInconsistency(
                "Store has vectors but no embedding fingerprint. Reset the knowledge base and ingest again."
                    .to_string(),
            )),
            None => self.record_fingerprint(),
        }
    }

    /// Write the embedder fingerprint, e.g. after a reset.
    pub fn record_fingerprint(&self) -> AppResult<()> {
        let raw = serde_json::to_string(&self.embedder.fingerprint())?;
        self.store.set_meta(META_EMBEDDING_FINGERPRINT, &raw)
    }
}
