//! The knowledge base facade: ingestion, search, answering and reset for one
//! named base in a workspace.

use crate::chunker::chunk_document;
use crate::config::{get_documents_dir, get_index_path, load_config, save_config};
use crate::context::{IndexSnapshot, RetrievalContext};
use crate::embeddings::{Embedder, EmbeddingConfig};
use crate::parser;
use crate::rag::{Answer, AnswerModel, Answerer};
use crate::retriever;
use crate::store::{ChunkStore, SqliteStore};
use crate::types::{
    DocumentOutcome, KnowledgeBaseConfig, KnowledgeBaseStats, LearnReport, SearchResult,
    SourceDocument,
};
use crate::vector_index::Metric;
use docqa_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use walkdir::WalkDir;

/// A loaded knowledge base.
///
/// Searches run concurrently against the published index snapshot. Ingestion
/// and reset take the write lock, so at most one of them is in flight.
#[derive(Debug)]
pub struct KnowledgeBase {
    workspace: PathBuf,
    config: KnowledgeBaseConfig,
    context: RetrievalContext,
    answerer: Answerer,
    write_lock: Mutex<()>,
}

impl KnowledgeBase {
    /// Open the base `base_name` in `workspace`, creating its store if needed.
    ///
    /// # Errors
    /// `ModelLoad` when the embedding model cannot be loaded, `Store` when the
    /// SQLite file cannot be opened, `IndexInconsistency` when the stored
    /// vectors were produced by another embedding configuration.
    pub async fn open(
        workspace: &Path,
        base_name: &str,
        answer_model: Arc<dyn AnswerModel>,
    ) -> AppResult<Self> {
        let config = load_config(workspace, base_name)?;
        let embedder = Embedder::load(&EmbeddingConfig::from_base(&config)).await?;
        let store = SqliteStore::open(
            &get_index_path(workspace, base_name),
            Some(get_documents_dir(workspace, base_name)),
        )?;

        let base = Self::with_parts(
            workspace,
            config,
            Arc::new(embedder),
            Arc::new(store),
            answer_model,
        )?;

        tracing::info!(
            base = base_name,
            chunks = base.context.snapshot().len(),
            embedder = base.context.embedder().provider_name(),
            answer_model = base.answerer.model_name(),
            "Opened knowledge base"
        );
        Ok(base)
    }

    /// Assemble a base from already constructed parts.
    pub fn with_parts(
        workspace: &Path,
        config: KnowledgeBaseConfig,
        embedder: Arc<Embedder>,
        store: Arc<dyn ChunkStore>,
        answer_model: Arc<dyn AnswerModel>,
    ) -> AppResult<Self> {
        config.validate()?;
        if embedder.dimension() != config.embedding_dimension {
            return Err(AppError::Config(format!(
                "Embedder produces {}-dimensional vectors but the base expects {}",
                embedder.dimension(),
                config.embedding_dimension
            )));
        }

        let context = RetrievalContext::open(embedder, store, Metric::Cosine)?;
        let answerer = Answerer::new(
            answer_model,
            Duration::from_secs(config.answer_timeout_secs),
        );

        Ok(Self {
            workspace: workspace.to_path_buf(),
            config,
            context,
            answerer,
            write_lock: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &KnowledgeBaseConfig {
        &self.config
    }

    pub fn context(&self) -> &RetrievalContext {
        &self.context
    }

    /// Ingest in-memory documents.
    ///
    /// Each document is chunked, embedded and persisted on its own; a document
    /// that fails is reported in the outcome list and the rest continue.
    /// Re-ingesting a source replaces its earlier chunks.
    ///
    /// # Errors
    /// `Store` when persistence fails. Chunks persisted by earlier documents
    /// in the same call stay in place.
    pub async fn ingest(&self, documents: Vec<SourceDocument>) -> AppResult<LearnReport> {
        let _guard = self.write_lock.lock().await;
        let start = Instant::now();
        let mut report = LearnReport::default();

        for document in &documents {
            let outcome = self.ingest_document(document).await?;
            report.push(outcome);
        }

        self.finish_report(report, start)
    }

    /// Ingest files and directories from disk.
    ///
    /// Directories are walked recursively. Chunks are labelled with the file
    /// name, and every successfully ingested file is copied into the base's
    /// `documents/` directory.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> AppResult<LearnReport> {
        let _guard = self.write_lock.lock().await;
        let start = Instant::now();
        let mut report = LearnReport::default();

        for file in collect_files(paths, &mut report) {
            let source = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());

            let text = match parser::parse_file(&file, self.config.max_file_size) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "Skipping file");
                    report.push(DocumentOutcome::failed(source, e.to_string()));
                    continue;
                }
            };

            let outcome = self
                .ingest_document(&SourceDocument::new(source.as_str(), text))
                .await?;
            if outcome.success {
                if let Err(e) = self.keep_copy(&file, &source) {
                    tracing::warn!(path = %file.display(), error = %e, "Failed to copy document");
                }
            }
            report.push(outcome);
        }

        save_config(&self.workspace, &self.config)?;
        self.finish_report(report, start)
    }

    /// Ranked chunks for `query`, using the base defaults where no override
    /// is given.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        similarity_threshold: Option<f32>,
    ) -> AppResult<Vec<SearchResult>> {
        retriever::search(
            &self.context,
            query,
            top_k.unwrap_or(self.config.top_k),
            similarity_threshold.unwrap_or(self.config.similarity_threshold),
        )
        .await
    }

    /// Retrieve and answer, surfacing failures.
    pub async fn try_ask(&self, question: &str) -> AppResult<Answer> {
        let results = self.search(question, None, None).await?;
        self.answerer.try_answer(question, &results).await
    }

    /// Retrieve and answer. Failures become the apology reply.
    pub async fn ask(&self, question: &str) -> Answer {
        match self.search(question, None, None).await {
            Ok(results) => self.answerer.respond(question, &results).await,
            Err(e) => {
                tracing::error!(error = %e, "Retrieval failed");
                Answer::apology()
            }
        }
    }

    /// The answer text for `question`. Always non-empty.
    pub async fn answer(&self, question: &str) -> String {
        self.ask(question).await.text
    }

    /// Delete every chunk, stored document copy and index entry.
    ///
    /// Irreversible; callers confirm with the user first. On failure the
    /// index is reloaded, so it matches whatever the store kept.
    pub async fn reset(&self) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        if let Err(e) = self.context.store().delete_all() {
            // The deletion may have committed before the failure; follow the store.
            tracing::error!(base = self.name(), error = %e, "Reset failed");
            self.context.reload_from_store()?;
            if self.context.snapshot().is_empty() {
                self.context.record_fingerprint()?;
            }
            return Err(e);
        }

        self.context.publish(IndexSnapshot::empty(
            self.context.embedder().dimension(),
            self.context.metric(),
        ));
        self.context.record_fingerprint()?;

        tracing::info!(base = self.name(), "Knowledge base reset");
        Ok(())
    }

    pub fn stats(&self) -> AppResult<KnowledgeBaseStats> {
        self.context.store().stats()
    }

    /// Chunk, embed, persist and index one document. Callers hold the write
    /// lock. Only store failures are returned as errors.
    async fn ingest_document(&self, document: &SourceDocument) -> AppResult<DocumentOutcome> {
        if document.text.trim().is_empty() {
            return Ok(DocumentOutcome::failed(&document.source, "Document has no text"));
        }

        let mut chunks = match chunk_document(
            document,
            self.config.chunk_size,
            self.config.chunk_overlap,
        ) {
            Ok(chunks) => chunks,
            Err(e) => return Ok(DocumentOutcome::failed(&document.source, e.to_string())),
        };

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = match self.context.embedder().embed(&texts).await {
            Ok(vectors) => vectors,
            Err(e) => {
                tracing::warn!(source = %document.source, error = %e, "Embedding failed");
                return Ok(DocumentOutcome::failed(&document.source, e.to_string()));
            }
        };
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.vector = vector;
        }

        let stale = self.context.store().persist(&chunks)?;

        match self.context.snapshot().with_changes(&chunks, &stale) {
            Ok(snapshot) => self.context.publish(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Incremental index update failed, reloading from store");
                self.context.reload_from_store()?;
            }
        }

        tracing::debug!(
            source = %document.source,
            chunks = chunks.len(),
            replaced = stale.len(),
            "Ingested document"
        );
        Ok(DocumentOutcome::succeeded(&document.source, chunks.len()))
    }

    fn keep_copy(&self, file: &Path, source: &str) -> AppResult<()> {
        let dir = get_documents_dir(&self.workspace, self.name());
        fs::create_dir_all(&dir)?;

        let target = dir.join(source);
        if fs::canonicalize(file).ok() != fs::canonicalize(&target).ok() {
            fs::copy(file, &target)?;
        }
        Ok(())
    }

    fn finish_report(&self, mut report: LearnReport, start: Instant) -> AppResult<LearnReport> {
        report.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            "Learn completed for '{}': {} documents ok, {} failed, {} chunks in {:.2}s",
            self.name(),
            report.succeeded(),
            report.failed(),
            report.chunks_created,
            report.duration_secs
        );
        Ok(report)
    }
}

/// Expand `paths` into files, recording missing paths as failures.
fn collect_files(paths: &[PathBuf], report: &mut LearnReport) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            report.push(DocumentOutcome::failed(
                path.display().to_string(),
                "Path does not exist",
            ));
        }
    }

    files
}
