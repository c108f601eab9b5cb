//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Configuration for a knowledge base, stored as `config.yaml` next to its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    #[serde(default)]
    pub name: String,

    /// Words per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Results requested from the index per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity for a chunk to ground an answer
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Embedding provider: "trigram" or "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Embedding model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint for HTTP embedding providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_endpoint: Option<String>,

    /// Texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    #[serde(default = "default_answer_timeout_secs")]
    pub answer_timeout_secs: u64,

    /// Largest file accepted for ingestion, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_top_k() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_provider() -> String {
    "trigram".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_embed_timeout_secs() -> u64 {
    30
}

fn default_answer_timeout_secs() -> u64 {
    60
}

fn default_max_file_size() -> u64 {
    20 * 1024 * 1024
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_dimension: default_embedding_dimension(),
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            provider: default_provider(),
            model: default_model(),
            embedding_endpoint: None,
            batch_size: default_batch_size(),
            embed_timeout_secs: default_embed_timeout_secs(),
            answer_timeout_secs: default_answer_timeout_secs(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Stable chunk identifier: hex SHA-256 of `"{source}:{chunk_index}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Derive the id of chunk `chunk_index` of `source`.
    pub fn derive(source: &str, chunk_index: usize) -> Self {
        let digest = Sha256::digest(format!("{}:{}", source, chunk_index).as_bytes());
        let hex = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }

    /// Wrap an id read back from storage.
    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A text chunk with its embedding. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    /// Source label (file name for ingested files)
    pub source: String,
    /// Position of the chunk within its source
    pub chunk_index: usize,
    /// Unit-normalized embedding
    pub vector: Vec<f32>,
}

impl Chunk {
    /// The part of the chunk kept next to the in-memory index.
    pub fn payload(&self) -> ChunkPayload {
        ChunkPayload {
            text: self.text.clone(),
            source: self.source.clone(),
            chunk_index: self.chunk_index,
        }
    }
}

/// Text and provenance of an indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub source: String,
    pub chunk_index: usize,
}

/// A ranked retrieval hit. Produced per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: ChunkId,
    pub text: String,
    pub source: String,
    /// Similarity in [-1, 1]; higher is closer
    pub score: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Read-only aggregate over the store, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    /// Distinct sources with at least one chunk
    pub document_count: usize,
    pub chunk_count: usize,
    /// Creation time of the newest chunk
    pub last_update: Option<DateTime<Utc>>,
}

/// Raw text handed to ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub source: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Ingestion result for a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub source: String,
    pub success: bool,
    pub chunks_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentOutcome {
    pub fn succeeded(source: impl Into<String>, chunks_created: usize) -> Self {
        Self {
            source: source.into(),
            success: true,
            chunks_created,
            error: None,
        }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            success: false,
            chunks_created: 0,
            error: Some(error.into()),
        }
    }
}

/// Statistics from a learn operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnReport {
    pub outcomes: Vec<DocumentOutcome>,
    pub chunks_created: usize,
    pub duration_secs: f64,
}

impl LearnReport {
    pub fn push(&mut self, outcome: DocumentOutcome) {
        self.chunks_created += outcome.chunks_created;
        self.outcomes.push(outcome);
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        let a = ChunkId::derive("faq.txt", 0);
        let b = ChunkId::derive("faq.txt", 0);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_chunk_id_depends_on_source_and_index() {
        let base = ChunkId::derive("faq.txt", 0);
        assert_ne!(base, ChunkId::derive("faq.txt", 1));
        assert_ne!(base, ChunkId::derive("other.txt", 0));
    }

    #[test]
    fn test_config_defaults_from_empty_yaml() {
        let config: KnowledgeBaseConfig = serde_yaml::from_str("name: kb\n").unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.max_file_size, 20 * 1024 * 1024);
    }

    #[test]
    fn test_learn_report_counts() {
        let mut report = LearnReport::default();
        report.push(DocumentOutcome::succeeded("a.txt", 4));
        report.push(DocumentOutcome::failed("b.pdf", "unsupported file type"));
        report.push(DocumentOutcome::succeeded("c.csv", 1));

        assert_eq!(report.chunks_created, 5);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
    }
}
