//! Offline embedding provider built from hashed word and character-trigram
//! features.

use crate::embeddings::provider::EmbeddingProvider;
use crate::text::normalized_words;
use docqa_core::AppResult;
use std::collections::BTreeMap;

const MODEL_NAME: &str = "trigram-v1";

/// Deterministic, content-aware embeddings for local use.
///
/// Each distinct word contributes a whole-word feature and one feature per
/// character trigram of the word padded with boundary markers. Features are
/// hashed into the vector with FNV-1a, so no vocabulary is needed. Words are
/// normalized first, which makes the output insensitive to case and to
/// surrounding punctuation. The result is unit length, or all zeros when the
/// text has no words.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        // BTreeMap keeps accumulation order stable, so output is bit-identical.
        let mut word_freq: BTreeMap<String, u32> = BTreeMap::new();
        for word in normalized_words(text) {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let weight = *freq as f32;
            embedding[self.slot(&format!("w:{}", word))] += weight;

            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.slot(&format!("t:{}", trigram))] += weight.sqrt();
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    fn slot(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dimensions as u64) as usize
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_trigram_provider_metadata() {
        let provider = TrigramProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[tokio::test]
    async fn test_trigram_provider_embed_batch() {
        let provider = TrigramProvider::new(384);
        let texts = vec![
            "hello world".to_string(),
            "test embedding".to_string(),
            "rust programming".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_trigram_provider_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "deterministic test with several several words";

        let embedding1 = provider.embed(text).await.unwrap();
        let embedding2 = provider.embed(text).await.unwrap();

        assert_eq!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_punctuation_and_case_insensitive() {
        let provider = TrigramProvider::new(384);

        let a = provider.embed("Столица России.").await.unwrap();
        let b = provider.embed("столица россии").await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = TrigramProvider::new(384);

        let query = provider.embed("столица России").await.unwrap();
        let related = provider
            .embed("Москва — столица России. Санкт-Петербург")
            .await
            .unwrap();
        let unrelated = provider.embed("рецепт борща со сметаной").await.unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_trigram_provider_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed(" — ").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_single_letter_words_embed() {
        let provider = TrigramProvider::new(64);
        let embedding = provider.embed("a ж 7").await.unwrap();

        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
