//! Knowledge base management and grounded question answering.
//!
//! Documents are split into overlapping word windows, embedded, persisted in
//! SQLite and indexed in memory. Questions are answered from the chunks that
//! clear the similarity threshold.

pub mod base;
pub mod chunker;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod parser;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod text;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use base::KnowledgeBase;
pub use config::DEFAULT_BASE;
pub use context::{IndexSnapshot, RetrievalContext};
pub use embeddings::{Embedder, EmbeddingConfig, EmbeddingProvider};
pub use rag::{create_answer_model, Answer, AnswerKind, AnswerModel, Answerer, SourceRef};
pub use store::{ChunkStore, SqliteStore};
pub use types::{
    Chunk, ChunkId, DocumentOutcome, KnowledgeBaseConfig, KnowledgeBaseStats, LearnReport,
    SearchResult, SourceDocument,
};
pub use vector_index::{FlatIndex, Metric, VectorIndex};
