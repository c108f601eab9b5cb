//! Vector index abstraction for knowledge chunks.
//!
//! The index is a derived projection of the store: it only holds
//! `(ChunkId, vector)` pairs and can always be rebuilt from `load_all`.

use crate::types::ChunkId;
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance function used by an index, together with the transform that
/// turns its distances into similarity scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `1 - cos(a, b)`; a zero vector has cosine 0 with everything.
    #[default]
    Cosine,
    /// `|a - b|^2`
    SquaredL2,
}

impl Metric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
            Metric::SquaredL2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }

    /// Monotonically decreasing map from distance to similarity.
    ///
    /// Cosine yields cosine similarity. Squared L2 yields `1 - d/2`, which
    /// equals cosine similarity for unit vectors.
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            Metric::Cosine => 1.0 - distance,
            Metric::SquaredL2 => 1.0 - distance / 2.0,
        }
    }
}

/// Cosine similarity in [-1, 1]; 0 when either vector has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Nearest-neighbour index over fixed-dimension vectors.
///
/// Implementations are not internally synchronized; callers share them
/// through immutable snapshots and mutate clones.
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    /// Insert vectors, replacing any entry with the same id.
    ///
    /// Fails without modifying the index when lengths or dimensions disagree.
    fn add(&mut self, vectors: &[Vec<f32>], ids: &[ChunkId]) -> AppResult<()>;

    /// Remove entries by id. Unknown ids are ignored.
    fn remove(&mut self, ids: &[ChunkId]);

    /// Up to `k` nearest entries, ascending by distance. Equal distances keep
    /// insertion order.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(ChunkId, f32)>>;

    /// Replace the whole index content.
    fn rebuild_from(&mut self, entries: Vec<(ChunkId, Vec<f32>)>) -> AppResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;

    fn metric(&self) -> Metric;

    fn boxed_clone(&self) -> Box<dyn VectorIndex>;
}

/// Exhaustive-scan index. Adequate for a few thousand chunks.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    ids: Vec<ChunkId>,
    /// Row-major, `ids.len() * dimension` values
    vectors: Vec<f32>,
    positions: HashMap<ChunkId, usize>,
}

impl FlatIndex {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            ids: Vec::new(),
            vectors: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn row(&self, position: usize) -> &[f32] {
        &self.vectors[position * self.dimension..(position + 1) * self.dimension]
    }

    fn check_dimension(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimension {
            return Err(AppError::Knowledge(format!(
                "Vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, vectors: &[Vec<f32>], ids: &[ChunkId]) -> AppResult<()> {
        if vectors.len() != ids.len() {
            return Err(AppError::Knowledge(format!(
                "add called with {} vectors and {} ids",
                vectors.len(),
                ids.len()
            )));
        }
        for vector in vectors {
            self.check_dimension(vector)?;
        }

        for (id, vector) in ids.iter().zip(vectors) {
            match self.positions.get(id) {
                Some(&position) => {
                    let start = position * self.dimension;
                    self.vectors[start..start + self.dimension].copy_from_slice(vector);
                }
                None => {
                    self.positions.insert(id.clone(), self.ids.len());
                    self.ids.push(id.clone());
                    self.vectors.extend_from_slice(vector);
                }
            }
        }

        Ok(())
    }

    fn remove(&mut self, ids: &[ChunkId]) {
        if !ids.iter().any(|id| self.positions.contains_key(id)) {
            return;
        }

        let mut kept_ids = Vec::with_capacity(self.ids.len());
        let mut kept_vectors = Vec::with_capacity(self.vectors.len());
        for (position, id) in self.ids.iter().enumerate() {
            if !ids.contains(id) {
                kept_ids.push(id.clone());
                kept_vectors.extend_from_slice(self.row(position));
            }
        }

        self.positions = kept_ids
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position))
            .collect();
        self.ids = kept_ids;
        self.vectors = kept_vectors;
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(ChunkId, f32)>> {
        if self.ids.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query)?;

        let mut scored: Vec<(usize, f32)> = (0..self.ids.len())
            .map(|position| (position, self.metric.distance(query, self.row(position))))
            .collect();

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| (self.ids[position].clone(), distance))
            .collect())
    }

    fn rebuild_from(&mut self, entries: Vec<(ChunkId, Vec<f32>)>) -> AppResult<()> {
        let mut rebuilt = FlatIndex::new(self.dimension, self.metric);
        let (ids, vectors): (Vec<ChunkId>, Vec<Vec<f32>>) = entries.into_iter().unzip();
        rebuilt.add(&vectors, &ids)?;
        *self = rebuilt;
        Ok(())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn boxed_clone(&self) -> Box<dyn VectorIndex> {
        Box::new(self.clone())
    }
}
