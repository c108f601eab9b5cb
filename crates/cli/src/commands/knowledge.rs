//! Knowledge command handler.
//!
//! Handles ingestion, search, reset and statistics for a knowledge base.

use super::{open_base, print_json};
use clap::{Args, Subcommand};
use docqa_core::{config::AppConfig, AppError, AppResult};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Ingest files or directories
    Learn(KnowledgeLearnCommand),
    /// Show the chunks retrieved for a query
    Search(KnowledgeSearchCommand),
    /// Delete every chunk and stored document
    Reset(KnowledgeResetCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
}

/// Ingest files or directories
#[derive(Args, Debug)]
pub struct KnowledgeLearnCommand {
    /// Knowledge base name
    pub base: String,

    /// Files or directories to ingest (txt, md, csv, json)
    #[arg(long, required = true)]
    pub path: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeLearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge learn command for base '{}'", self.base);

        let base = open_base(config, &self.base).await?;
        let report = base.ingest_paths(&self.path).await?;

        if self.json {
            return print_json(&report);
        }

        println!(
            "Learned {} documents ({} chunks) in {:.2}s",
            report.succeeded(),
            report.chunks_created,
            report.duration_secs
        );
        for outcome in report.outcomes.iter().filter(|o| !o.success) {
            println!(
                "  failed: {} ({})",
                outcome.source,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }

        Ok(())
    }
}

/// Show the chunks retrieved for a query
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Knowledge base name
    pub base: String,

    /// Query text
    pub query: String,

    /// Number of chunks to retrieve (default: from the base config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum similarity (default: from the base config)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge search command for base '{}'", self.base);

        if let Some(threshold) = self.threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(AppError::Config(format!(
                    "Threshold must be between -1 and 1, got {}",
                    threshold
                )));
            }
        }

        let base = open_base(config, &self.base).await?;
        let results = base.search(&self.query, self.top_k, self.threshold).await?;

        if self.json {
            return print_json(&results);
        }

        if results.is_empty() {
            println!("No relevant chunks found");
            return Ok(());
        }

        for (rank, result) in results.iter().enumerate() {
            println!("{}. [{:.3}] {}", rank + 1, result.score, result.source);
            println!("   {}", result.text);
        }

        Ok(())
    }
}

/// Delete every chunk and stored document
#[derive(Args, Debug)]
pub struct KnowledgeResetCommand {
    /// Knowledge base name
    pub base: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl KnowledgeResetCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge reset command for base '{}'", self.base);

        if !self.yes && !confirm(&self.base)? {
            println!("Reset cancelled");
            return Ok(());
        }

        let base = open_base(config, &self.base).await?;
        base.reset().await?;

        tracing::warn!("Knowledge base '{}' was reset", self.base);
        println!("Knowledge base '{}' reset", self.base);
        Ok(())
    }
}

/// Ask on stderr; only an explicit "y" or "yes" confirms.
fn confirm(base: &str) -> AppResult<bool> {
    eprint!(
        "This permanently deletes all chunks and documents of '{}'. Continue? [y/N] ",
        base
    );
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(is_confirmation(&line))
}

fn is_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Knowledge base name
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge stats command for base '{}'", self.base);

        let base = open_base(config, &self.base).await?;
        let stats = base.stats()?;

        if self.json {
            let output = serde_json::json!({
                "base": self.base,
                "documentCount": stats.document_count,
                "chunkCount": stats.chunk_count,
                "lastUpdate": stats.last_update,
            });
            return print_json(&output);
        }

        println!("Knowledge base: {}", self.base);
        println!("  Documents: {}", stats.document_count);
        println!("  Chunks: {}", stats.chunk_count);
        match stats.last_update {
            Some(last_update) => println!("  Last update: {}", last_update),
            None => println!("  Last update: never"),
        }

        Ok(())
    }
}

impl KnowledgeCommand {
    pub fn name(&self) -> &'static str {
        match &self.action {
            KnowledgeAction::Learn(_) => "knowledge.learn",
            KnowledgeAction::Search(_) => "knowledge.search",
            KnowledgeAction::Reset(_) => "knowledge.reset",
            KnowledgeAction::Stats(_) => "knowledge.stats",
        }
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Learn(cmd) => cmd.execute(config).await,
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Reset(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_requires_explicit_yes() {
        assert!(is_confirmation("y\n"));
        assert!(is_confirmation(" YES "));
        assert!(!is_confirmation("\n"));
        assert!(!is_confirmation("no"));
        assert!(!is_confirmation("yep"));
    }
}
