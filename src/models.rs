//! Core data types that flow through the ingestion and query pipeline.

use serde::Serialize;

/// A source document read from disk. Discarded once chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    /// File basename, e.g. `refund_policy.txt`.
    pub source: String,
}

/// A window of a document's text, the unit of indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub sequence_index: usize,
}

impl Chunk {
    /// Stable identity key: `"{source}_{sequence_index}"`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.source, self.sequence_index)
    }
}

/// A chunk tagged for the vector store: id, text, and `source` metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: String,
    pub text: String,
    pub source: String,
}

impl From<&Chunk> for IndexRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id(),
            text: chunk.text.clone(),
            source: chunk.source.clone(),
        }
    }
}

/// A ranked hit returned by a vector store query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMatch {
    pub id: String,
    pub text: String,
    pub source: String,
    /// Cosine similarity to the query embedding.
    pub score: f32,
}

/// The outcome of one question through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub question: String,
    pub answer: String,
    /// Retrieved chunk texts, most similar first.
    pub context: Vec<String>,
}
