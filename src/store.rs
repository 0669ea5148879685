//! Durable vector store backed by SQLite.
//!
//! Stores `{id, text, embedding}` triples per named collection and answers
//! nearest-neighbor queries by cosine similarity. Vectors are stored as
//! little-endian f32 BLOBs and similarity is computed in Rust over the
//! fetched rows; the metric is cosine at both upsert time and query time.
//!
//! Ranking ties are broken by insertion order: each row keeps the `seq`
//! it was first inserted with (an upsert of an existing id replaces text
//! and embedding but not `seq`), so repeated queries are deterministic.
//!
//! The store assumes single-writer discipline: one process opens the
//! database at a fixed path; no cross-process locking is layered on top
//! of what SQLite provides.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::PipelineError;

/// Handle to the SQLite database holding all collections.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create the schema. Idempotent.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dims INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id),
                FOREIGN KEY (collection) REFERENCES collections(name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Open or create the named collection. Idempotent: repeated calls with
    /// the same name refer to the same logical collection.
    pub async fn collection(&self, name: &str) -> Result<Collection> {
        sqlx::query("INSERT INTO collections (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(Collection {
            pool: self.pool.clone(),
            name: name.to_string(),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Handle to one named collection of chunk/embedding rows.
#[derive(Clone)]
pub struct Collection {
    pool: SqlitePool,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write `(id, document, embedding)` triples, last-write-wins on `id`.
    ///
    /// The collection's dimensionality is established by the first vector
    /// ever upserted; later vectors must agree with it.
    ///
    /// # Errors
    ///
    /// [`PipelineError::LengthMismatch`] if the three sequences differ in
    /// length, [`PipelineError::DimensionMismatch`] if any vector has the
    /// wrong length. Either failure rolls back the whole write.
    pub async fn upsert(
        &self,
        ids: &[String],
        documents: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        check_lengths(ids, documents, embeddings)?;
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        let dims = establish_dims(&mut tx, &self.name, embeddings).await?;
        check_dims(embeddings, dims)?;

        let mut seq: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(seq), -1) FROM chunks WHERE collection = ?")
                .bind(&self.name)
                .fetch_one(&mut *tx)
                .await?;

        for ((id, document), embedding) in ids.iter().zip(documents).zip(embeddings) {
            seq += 1;
            insert_chunk(&mut tx, &self.name, id, seq, document, embedding).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Atomically clear the collection and write a new set of triples.
    ///
    /// Used on document upload so the collection reflects only the latest
    /// document's chunks; a failure rolls back and leaves the previous
    /// contents intact.
    pub async fn replace(
        &self,
        ids: &[String],
        documents: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        check_lengths(ids, documents, embeddings)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE collection = ?")
            .bind(&self.name)
            .execute(&mut *tx)
            .await?;

        if !ids.is_empty() {
            let dims = establish_dims(&mut tx, &self.name, embeddings).await?;
            check_dims(embeddings, dims)?;

            for (seq, ((id, document), embedding)) in
                ids.iter().zip(documents).zip(embeddings).enumerate()
            {
                insert_chunk(&mut tx, &self.name, id, seq as i64, document, embedding).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Return at most `top_k` stored documents ranked by descending cosine
    /// similarity to `embedding`; ties fall back to insertion order. An
    /// empty collection yields an empty result, never an error.
    pub async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT text, embedding, seq FROM chunks WHERE collection = ? ORDER BY seq ASC",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, i64, String)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                let similarity = cosine_similarity(embedding, &vec);
                (similarity, row.get("seq"), row.get("text"))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(top_k);

        Ok(scored.into_iter().map(|(_, _, text)| text).collect())
    }

    /// Delete every row in the collection.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE collection = ?")
            .bind(&self.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of stored chunks.
    pub async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn check_lengths(
    ids: &[String],
    documents: &[String],
    embeddings: &[Vec<f32>],
) -> Result<(), PipelineError> {
    if ids.len() != documents.len() || ids.len() != embeddings.len() {
        return Err(PipelineError::LengthMismatch {
            ids: ids.len(),
            documents: documents.len(),
            embeddings: embeddings.len(),
        });
    }
    Ok(())
}

fn check_dims(embeddings: &[Vec<f32>], dims: usize) -> Result<(), PipelineError> {
    for embedding in embeddings {
        if embedding.len() != dims {
            return Err(PipelineError::DimensionMismatch {
                expected: dims,
                got: embedding.len(),
            });
        }
    }
    Ok(())
}

/// Read the collection's dimensionality, fixing it from the first incoming
/// vector if it was never set.
async fn establish_dims(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    name: &str,
    embeddings: &[Vec<f32>],
) -> Result<usize> {
    // The collections row may be missing if the handle was cloned before
    // the first open; make the write self-sufficient.
    sqlx::query("INSERT INTO collections (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut **tx)
        .await?;

    let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM collections WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

    match dims {
        Some(d) => Ok(d as usize),
        None => {
            let d = embeddings[0].len();
            sqlx::query("UPDATE collections SET dims = ? WHERE name = ?")
                .bind(d as i64)
                .bind(name)
                .execute(&mut **tx)
                .await?;
            Ok(d)
        }
    }
}

async fn insert_chunk(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    collection: &str,
    id: &str,
    seq: i64,
    text: &str,
    embedding: &[f32],
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO chunks (collection, id, seq, text, embedding)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(collection, id) DO UPDATE SET
            text = excluded.text,
            embedding = excluded.embedding
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(seq)
    .bind(text)
    .bind(vec_to_blob(embedding))
    .execute(&mut **tx)
    .await?;
    Ok(())
}
