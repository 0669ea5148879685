//! Embedding provider abstraction and the local model implementation.
//!
//! Defines the [`Embedder`] trait used by ingestion and retrieval, plus:
//! - **[`LocalEmbedder`]** — runs a sentence-embedding model locally via
//!   fastembed; the model is loaded lazily on first use and memoized for
//!   the life of the process (no network calls after model download).
//! - Vector utilities for BLOB storage: [`vec_to_blob`] / [`blob_to_vec`]
//!   encode a `Vec<f32>` as little-endian bytes for SQLite, and
//!   [`cosine_similarity`] is the store's similarity metric.
//!
//! The embedder is an injected dependency: the session layer holds an
//! `Arc<dyn Embedder>` handed in by the caller, so tests can substitute a
//! deterministic stub.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::EmbeddingConfig;

/// Trait for embedding backends.
///
/// `embed` maps a batch of texts to one fixed-length vector each, order
/// preserved. Embedding the same text twice with the same model yields
/// numerically indistinguishable vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (e.g. a retrieval query).
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty embedding response"))
    }
}

/// Create the configured embedder.
///
/// # Errors
///
/// Returns an error for unknown model names, or when the crate was built
/// without the `local-embeddings` feature.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    #[cfg(feature = "local-embeddings")]
    {
        Ok(Arc::new(LocalEmbedder::new(config)?))
    }
    #[cfg(not(feature = "local-embeddings"))]
    {
        let _ = config;
        anyhow::bail!("Embedding requires building with --features local-embeddings")
    }
}

// ============ Local provider (fastembed) ============

/// Embedding provider running a fastembed model in-process.
///
/// The model is downloaded on first use from Hugging Face and cached.
/// Loading is expensive, so the instance is created once, guarded by a
/// mutex, and reused for every batch.
#[cfg(feature = "local-embeddings")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: tokio::sync::Mutex<Option<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        // Fail on unknown names at construction, not on first embed.
        resolve_fastembed_model(&config.model)?;
        Ok(Self {
            model_name: config.model.clone(),
            dims: config.dims,
            batch_size: config.batch_size,
            model: tokio::sync::Mutex::new(None),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut guard = self.model.lock().await;
        let loaded = guard.take();
        let model_name = self.model_name.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        // Model init and inference are blocking CPU work.
        let outcome = tokio::task::spawn_blocking(move || {
            let mut model = match loaded {
                Some(m) => m,
                None => load_model(&model_name)?,
            };
            let result = model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("local embedding failed: {}", e));
            Ok::<_, anyhow::Error>((model, result))
        })
        .await?;

        let (model, result) = outcome?;
        *guard = Some(model);
        result
    }
}

#[cfg(feature = "local-embeddings")]
fn load_model(name: &str) -> Result<fastembed::TextEmbedding> {
    let model = resolve_fastembed_model(name)?;
    fastembed::TextEmbedding::try_new(
        fastembed::InitOptions::new(model).with_show_download_progress(true),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))
}

#[cfg(feature = "local-embeddings")]
fn resolve_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => anyhow::bail!(
            "Unknown embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5",
            other
        ),
    }
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Reverses [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
