//! Top-K chunk retrieval.
//!
//! Embeds the query text and asks the collection for the nearest stored
//! chunks. The caller is responsible for the not-ready check (no document
//! processed yet); this function assumes a valid collection handle.

use anyhow::Result;

use crate::embedding::Embedder;
use crate::store::Collection;

/// Default number of chunks used to ground an answer.
pub const DEFAULT_TOP_K: usize = 2;

/// Return the `top_k` stored chunk texts most relevant to `query_text`,
/// most similar first. Returns fewer when the collection is smaller, and
/// an empty sequence for an empty collection.
pub async fn retrieve(
    embedder: &dyn Embedder,
    collection: &Collection,
    query_text: &str,
    top_k: usize,
) -> Result<Vec<String>> {
    let query_vec = embedder.embed_one(query_text).await?;
    collection.query(&query_vec, top_k).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Maps each text to a crude bag-of-letters vector. Deterministic, so
    /// an exact text match always scores cosine 1.0.
    struct StubEmbedder;

    fn stub_vec(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 3];
        for c in text.chars() {
            v[(c as usize) % 3] += 1.0;
        }
        v
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn model_name(&self) -> &str {
            "stub"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| stub_vec(t)).collect())
        }
    }

    async fn seeded_collection() -> (TempDir, Collection) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("test.sqlite")).await.unwrap();
        store.init_schema().await.unwrap();
        let collection = store.collection("pdf_chunks").await.unwrap();

        // 'a', 'b', 'c' land in distinct buckets of the stub vector, so
        // these three chunks are mutually orthogonal.
        let texts = ["aaaa", "bbbb", "cccc"];
        let ids: Vec<String> = (0..texts.len()).map(|i| format!("chunk_{}", i)).collect();
        let docs: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let embs: Vec<Vec<f32>> = texts.iter().map(|t| stub_vec(t)).collect();
        collection.upsert(&ids, &docs, &embs).await.unwrap();

        (tmp, collection)
    }

    #[tokio::test]
    async fn exact_match_ranks_first() {
        let (_tmp, collection) = seeded_collection().await;
        let results = retrieve(&StubEmbedder, &collection, "bbbb", 1).await.unwrap();
        assert_eq!(results, vec!["bbbb".to_string()]);
    }

    #[tokio::test]
    async fn result_count_is_min_of_top_k_and_collection_size() {
        let (_tmp, collection) = seeded_collection().await;
        assert_eq!(
            retrieve(&StubEmbedder, &collection, "aaaa", 2).await.unwrap().len(),
            2
        );
        assert_eq!(
            retrieve(&StubEmbedder, &collection, "aaaa", 10).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn empty_collection_returns_empty_never_errors() {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("test.sqlite")).await.unwrap();
        store.init_schema().await.unwrap();
        let collection = store.collection("pdf_chunks").await.unwrap();

        let results = retrieve(&StubEmbedder, &collection, "anything", 2)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
