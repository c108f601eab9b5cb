//! Word-window chunking.
//!
//! Text is split on whitespace into words and cut into windows of
//! `chunk_size` words. Consecutive windows share `overlap` words. The last
//! window may be shorter; no window starts after the one that reaches the end
//! of the text.

use crate::types::{Chunk, ChunkId, SourceDocument};
use docqa_core::{AppError, AppResult};

/// Split `text` into overlapping word windows.
///
/// Returns an empty vector for text without words. Fails when `size` is zero
/// or `overlap >= size`, since the window would never advance.
pub fn chunk(text: &str, size: usize, overlap: usize) -> AppResult<Vec<String>> {
    if size == 0 || overlap >= size {
        return Err(AppError::Config(format!(
            "Invalid chunking parameters: size={}, overlap={} (need 0 <= overlap < size)",
            size, overlap
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = size - overlap;
    let mut chunks = Vec::new();

    for start in (0..words.len()).step_by(step) {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));

        if start + size >= words.len() {
            break;
        }
    }

    Ok(chunks)
}

/// Chunk a document and attach deterministic ids.
///
/// Vectors are left empty; the embedder fills them in.
pub fn chunk_document(
    document: &SourceDocument,
    size: usize,
    overlap: usize,
) -> AppResult<Vec<Chunk>> {
    let chunks = chunk(&document.text, size, overlap)?
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            id: ChunkId::derive(&document.source, chunk_index),
            text,
            source: document.source.clone(),
            chunk_index,
            vector: Vec::new(),
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn expected_count(w: usize, s: usize, o: usize) -> usize {
        if w <= s {
            1
        } else {
            (w - o).div_ceil(s - o)
        }
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk("", 5, 1).unwrap().is_empty());
        assert!(chunk("   \n ", 5, 1).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk("one two three", 5, 1).unwrap();
        assert_eq!(chunks, vec!["one two three"]);
    }

    #[test]
    fn test_exact_size_single_chunk() {
        let chunks = chunk(&words(5), 5, 1).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = chunk(&words(9), 5, 1).unwrap();
        assert_eq!(chunks, vec!["w0 w1 w2 w3 w4", "w4 w5 w6 w7 w8"]);
    }

    #[test]
    fn test_chunk_count_formula() {
        for (s, o) in [(5, 1), (5, 0), (4, 3), (500, 50), (3, 2)] {
            for w in 1..60 {
                let chunks = chunk(&words(w), s, o).unwrap();
                assert_eq!(
                    chunks.len(),
                    expected_count(w, s, o),
                    "w={} s={} o={}",
                    w,
                    s,
                    o
                );
            }
        }
    }

    #[test]
    fn test_last_window_reaches_end() {
        let chunks = chunk(&words(12), 5, 2).unwrap();
        assert_eq!(chunks.last().unwrap(), "w9 w10 w11");
    }

    #[test]
    fn test_invalid_overlap_fails_fast() {
        assert!(chunk("a b c", 3, 3).is_err());
        assert!(chunk("a b c", 3, 4).is_err());
        assert!(chunk("a b c", 0, 0).is_err());
    }

    #[test]
    fn test_chunk_document_ids() {
        let doc = SourceDocument::new("notes.txt", words(9));
        let chunks = chunk_document(&doc, 5, 1).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].id, ChunkId::derive("notes.txt", 1));
        assert!(chunks.iter().all(|c| c.vector.is_empty()));
    }
}
