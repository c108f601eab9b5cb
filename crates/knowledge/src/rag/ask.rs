//! Grounded answering over retrieved chunks.

use super::model::AnswerModel;
use super::types::{Answer, SourceRef};
use crate::types::SearchResult;
use docqa_core::{AppError, AppResult};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Maximum snippet length in characters
const MAX_SNIPPET_LENGTH: usize = 150;

/// Turns retrieval results into a final answer.
#[derive(Debug, Clone)]
pub struct Answerer {
    model: Arc<dyn AnswerModel>,
    timeout: Duration,
}

impl Answerer {
    pub fn new(model: Arc<dyn AnswerModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Answer `question` from `results`, surfacing model failures.
    ///
    /// No results yields the no-information reply without calling the model.
    /// Otherwise the chunk texts are joined, newline-separated and in rank
    /// order, into the context handed to the model.
    ///
    /// # Errors
    /// `AppError::Llm` when the model fails or exceeds the answer timeout.
    pub async fn try_answer(&self, question: &str, results: &[SearchResult]) -> AppResult<Answer> {
        if results.is_empty() {
            tracing::info!("No relevant context, returning no-information reply");
            return Ok(Answer::no_information(question));
        }

        let context = build_context(results);
        let sources = map_results_to_sources(results);
        let max_score = results.iter().map(|r| r.score).fold(f32::MIN, f32::max);

        tracing::debug!(
            model = self.model.name(),
            context_chars = context.chars().count(),
            "Generating answer"
        );

        let reply = tokio::time::timeout(self.timeout, self.model.answer(&context, question))
            .await
            .map_err(|_| {
                AppError::Llm(format!(
                    "Answer generation timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        match reply {
            Some(text) if !text.trim().is_empty() => {
                Ok(Answer::grounded(text.trim(), sources, max_score))
            }
            _ => Ok(Answer::no_exact_answer(sources, max_score)),
        }
    }

    /// Like [`try_answer`](Self::try_answer), but never fails: errors are
    /// logged and replaced by the apology reply.
    pub async fn respond(&self, question: &str, results: &[SearchResult]) -> Answer {
        match self.try_answer(question, results).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(error = %e, "Answer generation failed");
                Answer::apology()
            }
        }
    }

    /// The answer text for `question`. Always non-empty.
    pub async fn answer(&self, question: &str, results: &[SearchResult]) -> String {
        self.respond(question, results).await.text
    }
}

/// Newline-joined chunk texts in rank order.
fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One source reference per retrieved chunk, keeping rank order.
fn map_results_to_sources(results: &[SearchResult]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();

    results
        .iter()
        .filter(|r| seen.insert(r.chunk_id.clone()))
        .map(|r| {
            let location = r
                .metadata
                .get("chunk_index")
                .and_then(|v| v.as_u64())
                .map(|i| format!("chunk {}", i))
                .unwrap_or_else(|| "unknown".to_string());

            SourceRef {
                source: r.source.clone(),
                location,
                snippet: truncate_snippet(&r.text, MAX_SNIPPET_LENGTH),
                score: r.score,
            }
        })
        .collect()
}

/// Truncate to at most `max_chars` characters, preferring a word boundary.
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let Some((cut, _)) = trimmed.char_indices().nth(max_chars) else {
        return trimmed.to_string();
    };

    let head = &trimmed[..cut];
    match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => format!("{}...", head[..space].trim_end()),
        _ => format!("{}...", head),
    }
}
