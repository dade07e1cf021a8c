//! SQLite-backed [`VectorStore`] implementation.
//!
//! One row per index entry in `index_entries`, keyed by `(collection, id)`,
//! with the embedding stored as a little-endian `f32` BLOB. Rows carry the
//! embedding model name and a SHA-256 hash of the chunk text, so upserting
//! an unchanged chunk skips the embedder, and rows written by a different
//! model are ignored at query time.
//!
//! Search fetches every vector for the collection and ranks by cosine
//! similarity in Rust.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, embed_query, vec_to_blob, Embedder};
use crate::migrate;
use crate::models::{IndexRecord, StoreMatch};

use super::{check_vector_count, rank, VectorStore};

/// Persistent store in a single SQLite file.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &Path, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let pool = db::connect(path)
            .await
            .with_context(|| format!("Failed to open index database: {}", path.display()))?;
        migrate::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            collection: collection.to_string(),
            embedder,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Whether the stored row for `id` already holds `hash` embedded by the current model.
    async fn is_current(&self, id: &str, hash: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT content_hash, model FROM index_entries WHERE collection = ? AND id = ?",
        )
        .bind(&self.collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => {
                let stored_hash: String = row.get("content_hash");
                let model: String = row.get("model");
                stored_hash == hash && model == self.embedder.model_name()
            }
            None => false,
        })
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let mut pending = Vec::new();
        for record in records {
            let hash = content_hash(&record.text);
            if self.is_current(&record.id, &hash).await? {
                continue;
            }
            pending.push((record, hash));
        }

        debug!(
            collection = %self.collection,
            total = records.len(),
            changed = pending.len(),
            "sqlite upsert"
        );
        if pending.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = pending.iter().map(|(r, _)| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        check_vector_count(pending.len(), vectors.len())?;

        let model = self.embedder.model_name().to_string();
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for ((record, hash), vector) in pending.iter().zip(vectors.iter()) {
            sqlx::query(
                r#"
                INSERT INTO index_entries
                    (collection, id, source, text, content_hash, model, dims, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    source = excluded.source,
                    text = excluded.text,
                    content_hash = excluded.content_hash,
                    model = excluded.model,
                    dims = excluded.dims,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.source)
            .bind(&record.text)
            .bind(hash)
            .bind(&model)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_source(&self, source: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM index_entries WHERE collection = ? AND source = ?")
            .bind(&self.collection)
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn retain_source(&self, source: &str, keep: &[String]) -> Result<usize> {
        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let mut tx = self.pool.begin().await?;

        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM index_entries WHERE collection = ? AND source = ?")
                .bind(&self.collection)
                .bind(source)
                .fetch_all(&mut *tx)
                .await?;

        let mut removed = 0;
        for id in ids.iter().filter(|id| !keep.contains(id.as_str())) {
            let result = sqlx::query("DELETE FROM index_entries WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn query(&self, query_text: &str, k: usize) -> Result<Vec<StoreMatch>> {
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), query_text).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, source, text, embedding
            FROM index_entries
            WHERE collection = ? AND model = ?
            ORDER BY rowid
            "#,
        )
        .bind(&self.collection)
        .bind(self.embedder.model_name())
        .fetch_all(&self.pool)
        .await?;

        let matches = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                StoreMatch {
                    id: row.get("id"),
                    source: row.get("source"),
                    text: row.get("text"),
                    score: cosine_similarity(&query_vec, &vec),
                }
            })
            .collect();

        Ok(rank(matches, k))
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_entries WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}
