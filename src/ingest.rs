//! Ingestion: load documents, chunk them, and index the chunks.
//!
//! Re-ingesting a source replaces it. New chunks are upserted first; only
//! after that succeeds are entries of the same source that the new version
//! no longer produces removed. A document that shrank leaves no stale
//! trailing chunks, repeated ingests are idempotent, and a failed embedding
//! call leaves the previous index untouched.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::chunk::Chunker;
use crate::connector_fs;
use crate::models::{Chunk, Document, IndexRecord};
use crate::store::VectorStore;

/// Counts reported by an ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Tag `chunks` with their ids and `source` metadata and upsert them.
///
/// An empty slice is a logged no-op. Returns the number of chunks written.
pub async fn index_chunks(store: &dyn VectorStore, chunks: &[Chunk]) -> Result<usize> {
    if chunks.is_empty() {
        info!("no chunks to ingest");
        return Ok(0);
    }

    let records: Vec<IndexRecord> = chunks.iter().map(IndexRecord::from).collect();
    info!(chunks = records.len(), backend = store.backend(), "adding chunks to vector store");
    store.upsert(&records).await?;
    Ok(records.len())
}

/// Chunk every document, in order.
pub fn chunk_documents(chunker: &Chunker, docs: &[Document]) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| chunker.chunk_document(doc))
        .collect()
}

/// Replace the indexed contents of each document's source with its chunks.
pub async fn ingest_documents(
    store: &dyn VectorStore,
    chunker: &Chunker,
    docs: &[Document],
) -> Result<IngestReport> {
    let chunks = chunk_documents(chunker, docs);

    let mut ids_by_source: BTreeMap<&str, Vec<String>> = docs
        .iter()
        .map(|d| (d.source.as_str(), Vec::new()))
        .collect();
    for chunk in &chunks {
        if let Some(ids) = ids_by_source.get_mut(chunk.source.as_str()) {
            ids.push(chunk.id());
        }
    }

    let written = index_chunks(store, &chunks).await?;

    for (source, ids) in &ids_by_source {
        let removed = store.retain_source(source, ids).await?;
        if removed > 0 {
            info!(source = *source, removed, "removed stale chunks");
        }
    }

    Ok(IngestReport {
        documents: docs.len(),
        chunks: written,
    })
}

/// Load `*.txt` files from `dir` and ingest them.
pub async fn ingest_directory(
    store: &dyn VectorStore,
    chunker: &Chunker,
    dir: &Path,
) -> Result<IngestReport> {
    info!(dir = %dir.display(), "loading documents");
    let docs = connector_fs::load_documents(dir)?;
    info!(documents = docs.len(), "found documents");

    let report = ingest_documents(store, chunker, &docs).await?;
    info!(
        documents = report.documents,
        chunks = report.chunks,
        "data ingestion complete"
    );
    Ok(report)
}

/// Count documents and chunks in `dir` without touching any store.
pub fn dry_run(chunker: &Chunker, dir: &Path) -> Result<IngestReport> {
    let docs = connector_fs::load_documents(dir)?;
    let chunks = docs
        .iter()
        .map(|doc| chunker.split(&doc.content).count())
        .sum();
    Ok(IngestReport {
        documents: docs.len(),
        chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::store::{InMemoryVectorStore, SqliteVectorStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![1.0, t.len() as f32])
                .collect())
        }
    }

    /// Counts embedded texts; fails every call while `offline` is set.
    struct FlakyEmbedder {
        embedded: AtomicUsize,
        offline: AtomicBool,
    }

    impl FlakyEmbedder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                embedded: AtomicUsize::new(0),
                offline: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_name(&self) -> &str {
            "flaky"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.offline.load(Ordering::SeqCst) {
                anyhow::bail!("embedding service timed out");
            }
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![1.0, t.len() as f32])
                .collect())
        }
    }

    fn doc(source: &str, content: &str) -> Document {
        Document {
            content: content.to_string(),
            source: source.to_string(),
        }
    }

    #[tokio::test]
    async fn test_index_empty_is_noop() {
        let store = InMemoryVectorStore::new(Arc::new(LengthEmbedder));
        assert_eq!(index_chunks(&store, &[]).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reingest_replaces_source() {
        let store = InMemoryVectorStore::new(Arc::new(LengthEmbedder));
        let chunker = Chunker::new(10, 2).unwrap();

        let long = doc("refunds.txt", &"r".repeat(40));
        let report = ingest_documents(&store, &chunker, &[long]).await.unwrap();
        assert_eq!(report.chunks, 5);
        assert_eq!(store.count().await.unwrap(), 5);

        let short = doc("refunds.txt", "short");
        let report = ingest_documents(&store, &chunker, &[short.clone()])
            .await
            .unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(store.count().await.unwrap(), 1);

        ingest_documents(&store, &chunker, &[short]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_reingest_skips_unchanged_chunks() {
        let tmp = tempfile::TempDir::new().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("a.txt"), "r".repeat(25)).unwrap();

        let embedder = FlakyEmbedder::new();
        let store = SqliteVectorStore::open(
            &tmp.path().join("index.sqlite"),
            "policy_docs",
            embedder.clone(),
        )
        .await
        .unwrap();
        let chunker = Chunker::new(10, 2).unwrap();

        ingest_directory(&store, &chunker, &data).await.unwrap();
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);

        ingest_directory(&store, &chunker, &data).await.unwrap();
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);
        assert_eq!(store.count().await.unwrap(), 3);

        // Shrinking the document re-embeds the changed tail and drops the rest.
        std::fs::write(data.join("a.txt"), "r".repeat(12)).unwrap();
        ingest_directory(&store, &chunker, &data).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        store.close().await;
    }

    #[tokio::test]
    async fn test_failed_embedding_keeps_previous_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("a.txt"), "Refunds within 30 days.").unwrap();

        let embedder = FlakyEmbedder::new();
        let store = SqliteVectorStore::open(
            &tmp.path().join("index.sqlite"),
            "policy_docs",
            embedder.clone(),
        )
        .await
        .unwrap();
        let chunker = Chunker::default();

        ingest_directory(&store, &chunker, &data).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        std::fs::write(data.join("a.txt"), "Refunds within 14 days.").unwrap();
        embedder.offline.store(true, Ordering::SeqCst);
        let err = ingest_directory(&store, &chunker, &data).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(store.count().await.unwrap(), 1);

        embedder.offline.store(false, Ordering::SeqCst);
        let hits = store.query("refunds", 1).await.unwrap();
        assert_eq!(hits[0].text, "Refunds within 30 days.");
        store.close().await;
    }

    #[test]
    fn test_dry_run_counts() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "x".repeat(1000)).unwrap();
        std::fs::write(tmp.path().join("b.txt"), "").unwrap();
        std::fs::write(tmp.path().join("c.md"), "ignored").unwrap();

        let report = dry_run(&Chunker::default(), tmp.path()).unwrap();
        assert_eq!(
            report,
            IngestReport {
                documents: 2,
                chunks: 3
            }
        );
    }
}
