//! In-memory [`VectorStore`] implementation.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`, in insertion order.
//! Search is brute-force cosine similarity over all stored vectors.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, embed_query, Embedder};
use crate::models::{IndexRecord, StoreMatch};

use super::{check_vector_count, rank, VectorStore};

struct StoredEntry {
    record: IndexRecord,
    vector: Vec<f32>,
}

/// Ephemeral store; contents vanish with the process.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        check_vector_count(records.len(), vectors.len())?;

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        for (record, vector) in records.iter().zip(vectors) {
            let entry = StoredEntry {
                record: record.clone(),
                vector,
            };
            match entries.iter_mut().find(|e| e.record.id == record.id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }
        Ok(())
    }

    async fn delete_source(&self, source: &str) -> Result<usize> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let before = entries.len();
        entries.retain(|e| e.record.source != source);
        Ok(before - entries.len())
    }

    async fn retain_source(&self, source: &str, keep: &[String]) -> Result<usize> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let before = entries.len();
        entries.retain(|e| e.record.source != source || keep.contains(&e.record.id));
        Ok(before - entries.len())
    }

    async fn query(&self, query_text: &str, k: usize) -> Result<Vec<StoreMatch>> {
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), query_text).await?;

        let entries = self.entries.read().map_err(|_| poisoned())?;
        let matches = entries
            .iter()
            .map(|e| StoreMatch {
                id: e.record.id.clone(),
                text: e.record.text.clone(),
                source: e.record.source.clone(),
                score: cosine_similarity(&query_vec, &e.vector),
            })
            .collect();

        Ok(rank(matches, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(|_| poisoned())?.len())
    }
}
