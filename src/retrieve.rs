//! Top-k retrieval over the vector store.

use anyhow::Result;
use tracing::debug;

use crate::models::StoreMatch;
use crate::store::VectorStore;

pub const DEFAULT_TOP_K: usize = 3;

/// Ranked matches for `query`, best first. A blank query retrieves nothing.
pub async fn retrieve_matches(
    store: &dyn VectorStore,
    query: &str,
    k: usize,
) -> Result<Vec<StoreMatch>> {
    if query.trim().is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let matches = store.query(query, k).await?;
    debug!(
        k,
        hits = matches.len(),
        top_score = ?matches.first().map(|m| m.score),
        "retrieved context"
    );
    Ok(matches)
}

/// Up to `k` chunk texts for `query`, most similar first.
pub async fn retrieve(store: &dyn VectorStore, query: &str, k: usize) -> Result<Vec<String>> {
    Ok(retrieve_matches(store, query, k)
        .await?
        .into_iter()
        .map(|m| m.text)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IndexRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns canned matches and records the queries it receives.
    struct CannedStore {
        matches: Vec<StoreMatch>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl VectorStore for CannedStore {
        fn backend(&self) -> &str {
            "canned"
        }
        async fn upsert(&self, _records: &[IndexRecord]) -> Result<()> {
            Ok(())
        }
        async fn delete_source(&self, _source: &str) -> Result<usize> {
            Ok(0)
        }
        async fn retain_source(&self, _source: &str, _keep: &[String]) -> Result<usize> {
            Ok(0)
        }
        async fn query(&self, query_text: &str, k: usize) -> Result<Vec<StoreMatch>> {
            self.queries
                .lock()
                .unwrap()
                .push((query_text.to_string(), k));
            Ok(self.matches.iter().take(k).cloned().collect())
        }
        async fn count(&self) -> Result<usize> {
            Ok(self.matches.len())
        }
    }

    fn canned(texts: &[&str]) -> CannedStore {
        CannedStore {
            matches: texts
                .iter()
                .enumerate()
                .map(|(i, t)| StoreMatch {
                    id: format!("doc.txt_{}", i),
                    text: t.to_string(),
                    source: "doc.txt".to_string(),
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_returns_texts_in_store_order() {
        let store = canned(&["first", "second", "third", "fourth"]);
        let texts = retrieve(&store, "refunds", DEFAULT_TOP_K).await.unwrap();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(
            store.queries.lock().unwrap().as_slice(),
            &[("refunds".to_string(), 3)]
        );
    }

    #[tokio::test]
    async fn test_blank_query_skips_store() {
        let store = canned(&["first"]);
        assert!(retrieve(&store, "   ", 3).await.unwrap().is_empty());
        assert!(retrieve(&store, "refunds", 0).await.unwrap().is_empty());
        assert!(store.queries.lock().unwrap().is_empty());
    }
}
