//! Query pipeline: retrieve → format → generate.
//!
//! [`RagPipeline`] composes a [`VectorStore`], a [`Chunker`], and an
//! [`AnswerGenerator`]. Each [`query`](RagPipeline::query) re-embeds the
//! question; the only state carried between calls is the generator's
//! resolved model id.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::chunk::Chunker;
use crate::generate::AnswerGenerator;
use crate::ingest::{self, IngestReport};
use crate::models::QueryResult;
use crate::prompt::PromptTemplate;
use crate::retrieve::{self, DEFAULT_TOP_K};
use crate::store::VectorStore;

pub struct RagPipeline {
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
    generator: AnswerGenerator,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(store: Arc<dyn VectorStore>, chunker: Chunker, generator: AnswerGenerator) -> Self {
        Self {
            store,
            chunker,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    pub async fn resolved_model(&self) -> &str {
        self.generator.resolved_model().await
    }

    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        ingest::ingest_directory(self.store.as_ref(), &self.chunker, dir).await
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>> {
        retrieve::retrieve(self.store.as_ref(), question, self.top_k).await
    }

    /// Answer `question` with `template`.
    ///
    /// Store failures propagate. Generation failures do not: their
    /// rendered [`GenerationError`](crate::error::GenerationError) becomes
    /// the answer text.
    pub async fn query(&self, question: &str, template: &PromptTemplate) -> Result<QueryResult> {
        let context = self.retrieve(question).await?;

        let answer = match self
            .generator
            .generate_answer(question, &context, template)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(model = %err.model, detail = %err.detail, "generation failed");
                err.to_string()
            }
        };

        Ok(QueryResult {
            question: question.to_string(),
            answer,
            context,
        })
    }
}
