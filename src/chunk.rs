//! Fixed-size word-window text chunker.
//!
//! Splits normalized document text on whitespace and emits successive
//! non-overlapping windows of `size` words; the final window may be short.
//! Chunking is deterministic, which is what makes the ordinal-derived
//! chunk ids stable across re-uploads of the same document.

use crate::error::PipelineError;
use crate::models::Chunk;

/// Default window size in words, matching the ingest pipeline default.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Split `text` into windows of `size` words.
///
/// Empty input yields an empty sequence. `size == 0` is rejected with
/// [`PipelineError::InvalidArgument`].
pub fn chunk_text(text: &str, size: usize) -> Result<Vec<String>, PipelineError> {
    if size == 0 {
        return Err(PipelineError::InvalidArgument(
            "chunk size must be > 0".to_string(),
        ));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    Ok(words.chunks(size).map(|window| window.join(" ")).collect())
}

/// Chunk `text` and assign each window its stable id (`chunk_<ordinal>`)
/// in document order.
pub fn chunk_document(text: &str, size: usize) -> Result<Vec<Chunk>, PipelineError> {
    let chunks = chunk_text(text, size)?
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: format!("chunk_{}", i),
            ordinal: i as i64,
            text,
        })
        .collect();
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 500).unwrap().is_empty());
        assert!(chunk_text("   \n\t  ", 500).unwrap().is_empty());
    }

    #[test]
    fn zero_size_is_invalid() {
        let err = chunk_text("some words", 0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
    }

    #[test]
    fn exact_multiple_fills_every_window() {
        // 500 words at size 500 is exactly one chunk.
        let chunks = chunk_text(&words(500), 500).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].split_whitespace().count(), 500);
    }

    #[test]
    fn trailing_window_may_be_short() {
        // 1001 words at size 500 is 500 + 500 + 1.
        let chunks = chunk_text(&words(1001), 500).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split_whitespace().count(), 500);
        assert_eq!(chunks[1].split_whitespace().count(), 500);
        assert_eq!(chunks[2].split_whitespace().count(), 1);
    }

    #[test]
    fn chunk_count_is_ceil_of_word_count() {
        for (n, size) in [(1, 500), (499, 500), (500, 500), (501, 500), (7, 3)] {
            let chunks = chunk_text(&words(n), size).unwrap();
            assert_eq!(chunks.len(), n.div_ceil(size), "n={} size={}", n, size);
        }
    }

    #[test]
    fn rejoined_chunks_reconstruct_the_words() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk_text(text, 3).unwrap();
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn deterministic_across_calls() {
        let text = words(1234);
        let a = chunk_text(&text, 100).unwrap();
        let b = chunk_text(&text, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn document_chunks_get_ordinal_ids() {
        let chunks = chunk_document(&words(7), 3).unwrap();
        assert_eq!(chunks.len(), 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.id, format!("chunk_{}", i));
            assert_eq!(c.ordinal, i as i64);
        }
    }
}
