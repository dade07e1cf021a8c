//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the seam between the pipeline and whatever
//! holds the index. A store owns its [`Embedder`](crate::embedding::Embedder):
//! callers hand it texts, never vectors, the same way a hosted vector
//! database is configured with an embedding function.
//!
//! | Backend | Module | Lifetime |
//! |---------|--------|----------|
//! | `memory` | [`memory`] | Process; rebuilt by every ingest |
//! | `sqlite` | [`sqlite`] | Persistent file, reused across runs |

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::embedding::Embedder;
use crate::models::{IndexRecord, StoreMatch};

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// Storage and nearest-neighbour search over embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs (`"memory"`, `"sqlite"`).
    fn backend(&self) -> &str;

    /// Embed and store `records`, overwriting any entry with the same id.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()>;

    /// Remove every entry whose `source` metadata equals `source`.
    /// Returns the number of entries removed.
    async fn delete_source(&self, source: &str) -> Result<usize>;

    /// Remove entries tagged with `source` whose id is not in `keep`.
    /// Returns the number of entries removed.
    async fn retain_source(&self, source: &str, keep: &[String]) -> Result<usize>;

    /// Return up to `k` entries by decreasing cosine similarity to
    /// `query_text`. Ties keep insertion order.
    async fn query(&self, query_text: &str, k: usize) -> Result<Vec<StoreMatch>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;
}

/// Open the backend named in `config`, wired to `embedder`.
pub async fn open_store(
    config: &StoreConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryVectorStore::new(embedder))),
        "sqlite" => Ok(Arc::new(
            SqliteVectorStore::open(&config.path, &config.collection, embedder).await?,
        )),
        other => anyhow::bail!("Unknown store backend: {}", other),
    }
}

/// Sort matches by descending score, keeping the incoming order for ties,
/// and keep the first `k`.
pub(crate) fn rank(mut matches: Vec<StoreMatch>, k: usize) -> Vec<StoreMatch> {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(k);
    matches
}

/// Check that an embedder returned one vector per input.
pub(crate) fn check_vector_count(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        anyhow::bail!(
            "Embedder returned {} vectors for {} texts",
            got,
            expected
        );
    }
    Ok(())
}
