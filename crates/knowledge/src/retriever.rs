//! Query-time retrieval: embed, rank, convert, filter.

use crate::context::RetrievalContext;
use crate::types::SearchResult;
use docqa_core::AppResult;

/// Top chunks for `query` whose similarity is at least `similarity_threshold`.
///
/// The query is embedded once and the index asked for `top_k` neighbours; the
/// threshold is applied afterwards, so it can only shrink that list. Distances
/// become similarities through the index metric's own transform. Results are
/// sorted by descending similarity, ties in index order.
///
/// An empty index returns no results without calling the embedder.
///
/// # Errors
/// `AppError::Embedding` when the query cannot be embedded.
pub async fn search(
    context: &RetrievalContext,
    query: &str,
    top_k: usize,
    similarity_threshold: f32,
) -> AppResult<Vec<SearchResult>> {
    let snapshot = context.snapshot();
    if snapshot.is_empty() || top_k == 0 {
        tracing::debug!("Index is empty, skipping search");
        return Ok(Vec::new());
    }

    let query_vector = context.embedder().embed_query(query).await?;
    let neighbours = snapshot.index.search(&query_vector, top_k)?;
    let metric = snapshot.index.metric();

    let results: Vec<SearchResult> = neighbours
        .into_iter()
        .filter_map(|(chunk_id, distance)| {
            let score = metric.similarity(distance);
            if score < similarity_threshold {
                return None;
            }

            let payload = snapshot.payloads.get(&chunk_id)?;
            Some(SearchResult {
                text: payload.text.clone(),
                source: payload.source.clone(),
                score,
                metadata: serde_json::json!({
                    "chunk_index": payload.chunk_index,
                    "distance": distance,
                }),
                chunk_id,
            })
        })
        .collect();

    match (results.first(), results.last()) {
        (Some(top), Some(lowest)) => tracing::info!(
            "Retrieved {} relevant chunks (top score: {:.3}, lowest: {:.3})",
            results.len(),
            top.score,
            lowest.score
        ),
        _ => tracing::info!(
            "No relevant chunks found (threshold {:.2})",
            similarity_threshold
        ),
    }

    Ok(results)
}
