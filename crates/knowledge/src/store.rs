//! Durable chunk storage.
//!
//! The store is the source of truth for a knowledge base; the vector index
//! is rebuilt from [`ChunkStore::load_all`]. Vectors are stored as raw
//! little-endian `f32` bytes, 4 bytes per component, no header.

use crate::types::{Chunk, ChunkId, KnowledgeBaseStats};
use chrono::{DateTime, SecondsFormat, Utc};
use docqa_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Metadata key holding the JSON embedding fingerprint.
pub const META_EMBEDDING_FINGERPRINT: &str = "embedding_fingerprint";

/// Persistence backend for chunks.
pub trait ChunkStore: Send + Sync + std::fmt::Debug {
    /// Save chunks atomically: either every chunk in the call is stored or
    /// none is.
    ///
    /// The call is the complete chunk set for each source it mentions. Older
    /// chunks of those sources that are not in the call are deleted in the
    /// same transaction and their ids returned.
    fn persist(&self, chunks: &[Chunk]) -> AppResult<Vec<ChunkId>>;

    /// Every stored chunk, in insertion order.
    fn load_all(&self) -> AppResult<Vec<Chunk>>;

    /// Remove all chunks, metadata and stored document copies.
    ///
    /// Irreversible. Confirmation is the caller's job.
    fn delete_all(&self) -> AppResult<()>;

    fn count(&self) -> AppResult<usize>;

    fn stats(&self) -> AppResult<KnowledgeBaseStats>;

    fn get_meta(&self, key: &str) -> AppResult<Option<String>>;

    fn set_meta(&self, key: &str, value: &str) -> AppResult<()>;
}

/// SQLite-backed store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    documents_dir: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`.
    ///
    /// `documents_dir` is the directory holding copies of ingested files;
    /// [`ChunkStore::delete_all`] empties it.
    pub fn open(db_path: &Path, documents_dir: Option<PathBuf>) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;

        tracing::debug!("Opened SQLite store at {:?}", db_path);
        Self::with_connection(conn, documents_dir)
    }

    /// A throwaway store, used by tests.
    pub fn open_in_memory(documents_dir: Option<PathBuf>) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;
        Self::with_connection(conn, documents_dir)
    }

    fn with_connection(conn: Connection, documents_dir: Option<PathBuf>) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                vector BLOB NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);

            CREATE TABLE IF NOT EXISTS kb_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            documents_dir,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-call cannot leave SQLite half-written; keep serving.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clear_documents(&self) -> AppResult<()> {
        let Some(dir) = &self.documents_dir else {
            return Ok(());
        };
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }

        tracing::debug!("Cleared stored documents in {:?}", dir);
        Ok(())
    }
}

fn store_err(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Store(format!("{}: {}", context, e))
}

impl ChunkStore for SqliteStore {
    fn persist(&self, chunks: &[Chunk]) -> AppResult<Vec<ChunkId>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let new_ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let mut sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();

        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(store_err("Failed to begin transaction"))?;

        let mut stale = Vec::new();
        {
            let mut select = tx
                .prepare("SELECT id FROM chunks WHERE source = ?1 ORDER BY chunk_index")
                .map_err(store_err("Failed to prepare stale lookup"))?;
            for source in &sources {
                let ids = select
                    .query_map(params![source], |row| row.get::<_, String>(0))
                    .map_err(store_err("Failed to look up existing chunks"))?;
                for id in ids {
                    let id = id.map_err(store_err("Failed to read chunk id"))?;
                    if !new_ids.contains(id.as_str()) {
                        stale.push(ChunkId::from_stored(id));
                    }
                }
            }

            let mut delete = tx
                .prepare("DELETE FROM chunks WHERE id = ?1")
                .map_err(store_err("Failed to prepare delete"))?;
            for id in &stale {
                delete
                    .execute(params![id.as_str()])
                    .map_err(store_err("Failed to delete stale chunk"))?;
            }

            let mut insert = tx
                .prepare(
                    "INSERT OR REPLACE INTO chunks (id, source, chunk_index, text, vector, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(store_err("Failed to prepare insert"))?;
            for chunk in chunks {
                if chunk.vector.is_empty() {
                    return Err(AppError::Store(format!(
                        "Chunk {} of '{}' has no vector",
                        chunk.chunk_index, chunk.source
                    )));
                }
                insert
                    .execute(params![
                        chunk.id.as_str(),
                        chunk.source,
                        chunk.chunk_index as i64,
                        chunk.text,
                        vector_to_bytes(&chunk.vector),
                        now,
                    ])
                    .map_err(store_err("Failed to insert chunk"))?;
            }
        }

        tx.commit().map_err(store_err("Failed to commit chunks"))?;

        tracing::debug!(
            persisted = chunks.len(),
            removed = stale.len(),
            "Persisted chunks"
        );
        Ok(stale)
    }

    fn load_all(&self) -> AppResult<Vec<Chunk>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, source, chunk_index, text, vector FROM chunks ORDER BY rowid")
            .map_err(store_err("Failed to prepare load"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })
            .map_err(store_err("Failed to load chunks"))?;

        let mut chunks = Vec::new();
        for row in rows {
            let (id, source, chunk_index, text, bytes) =
                row.map_err(store_err("Failed to read chunk row"))?;
            let vector = bytes_to_vector(&bytes).map_err(|e| {
                AppError::Store(format!("Chunk {} has a corrupt vector: {}", id, e))
            })?;

            chunks.push(Chunk {
                id: ChunkId::from_stored(id),
                text,
                source,
                chunk_index: chunk_index as usize,
                vector,
            });
        }

        Ok(chunks)
    }

    fn delete_all(&self) -> AppResult<()> {
        {
            let mut conn = self.conn();
            let tx = conn
                .transaction()
                .map_err(store_err("Failed to begin transaction"))?;
            tx.execute("DELETE FROM chunks", [])
                .map_err(store_err("Failed to delete chunks"))?;
            tx.execute("DELETE FROM kb_meta", [])
                .map_err(store_err("Failed to delete metadata"))?;
            tx.commit().map_err(store_err("Failed to commit reset"))?;
        }

        self.clear_documents()
            .map_err(|e| AppError::Store(format!("Failed to remove stored documents: {}", e)))?;

        tracing::info!("Deleted all chunks from store");
        Ok(())
    }

    fn count(&self) -> AppResult<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(store_err("Failed to count chunks"))?;
        Ok(count as usize)
    }

    fn stats(&self) -> AppResult<KnowledgeBaseStats> {
        let (documents, chunks, last): (i64, i64, Option<String>) = self
            .conn()
            .query_row(
                "SELECT COUNT(DISTINCT source), COUNT(*), MAX(created_at) FROM chunks",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(store_err("Failed to compute stats"))?;

        let last_update = last
            .map(|ts| {
                DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| AppError::Store(format!("Invalid timestamp '{}': {}", ts, e)))
            })
            .transpose()?;

        Ok(KnowledgeBaseStats {
            document_count: documents as usize,
            chunk_count: chunks as usize,
            last_update,
        })
    }

    fn get_meta(&self, key: &str) -> AppResult<Option<String>> {
        self.conn()
            .query_row(
                "SELECT value FROM kb_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err("Failed to read metadata"))
    }

    fn set_meta(&self, key: &str, value: &str) -> AppResult<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO kb_meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(store_err("Failed to write metadata"))?;
        Ok(())
    }
}

/// Encode a vector as little-endian `f32` bytes.
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian `f32` bytes.
pub fn bytes_to_vector(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store(format!(
            "Invalid vector byte length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
