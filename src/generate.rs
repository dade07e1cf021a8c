//! Answer generation with lazy, cached model resolution.
//!
//! The model id used for every call is resolved once per
//! [`AnswerGenerator`], on first use:
//!
//! 1. listing models fails → the requested id (fallback if blank)
//! 2. requested id is advertised → requested id
//! 3. fallback id is advertised → fallback id
//! 4. anything is advertised → the lexicographically smallest id
//! 5. nothing is advertised → the requested id (fallback if blank)
//!
//! Generation never propagates a service error: it returns a
//! [`GenerationError`] naming the model that was attempted.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::GenerationError;
use crate::llm::{ChatMessage, CompletionService};
use crate::prompt::PromptTemplate;

pub struct AnswerGenerator {
    service: Arc<dyn CompletionService>,
    requested: String,
    fallback: String,
    resolved: OnceCell<String>,
}

impl AnswerGenerator {
    pub fn new(
        service: Arc<dyn CompletionService>,
        requested: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            service,
            requested: requested.into().trim().to_string(),
            fallback: fallback.into().trim().to_string(),
            resolved: OnceCell::new(),
        }
    }

    pub fn requested_model(&self) -> &str {
        &self.requested
    }

    /// The model id in use, resolving it on the first call.
    pub async fn resolved_model(&self) -> &str {
        self.resolved.get_or_init(|| self.resolve()).await
    }

    fn requested_or_fallback(&self) -> String {
        if self.requested.is_empty() {
            self.fallback.clone()
        } else {
            self.requested.clone()
        }
    }

    async fn resolve(&self) -> String {
        let available = match self.service.list_models().await {
            Ok(models) => models,
            Err(e) => {
                let model = self.requested_or_fallback();
                warn!(error = %e, model = %model, "model listing failed; using requested model");
                return model;
            }
        };

        let model = pick_model(&self.requested, &self.fallback, &available)
            .unwrap_or_else(|| self.requested_or_fallback());
        if model != self.requested {
            info!(requested = %self.requested, resolved = %model, "requested model unavailable");
        }
        model
    }

    /// Send `prompt` as a single user message.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let model = self.resolved_model().await;
        self.service
            .complete(model, &[ChatMessage::user(prompt)])
            .await
            .map_err(|e| GenerationError {
                model: model.to_string(),
                detail: format!("{:#}", e),
            })
    }

    /// Render `template` with `context` and `question`, then generate.
    pub async fn generate_answer(
        &self,
        question: &str,
        context: &[String],
        template: &PromptTemplate,
    ) -> Result<String, GenerationError> {
        let prompt = template.render(context, question);
        self.generate(&prompt).await
    }
}

/// Apply resolution steps 2–4 to a successful listing.
fn pick_model(requested: &str, fallback: &str, available: &[String]) -> Option<String> {
    if !requested.is_empty() && available.iter().any(|m| m == requested) {
        return Some(requested.to_string());
    }
    if available.iter().any(|m| m == fallback) {
        return Some(fallback.to_string());
    }
    available.iter().min().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted service: each `list_models` call pops the next listing.
    struct ScriptedService {
        listings: Mutex<Vec<Result<Vec<String>, String>>>,
        list_calls: AtomicUsize,
        completed_with: Mutex<Vec<String>>,
        fail_completion: bool,
    }

    impl ScriptedService {
        fn new(listings: Vec<Result<Vec<&str>, &str>>, fail_completion: bool) -> Arc<Self> {
            Arc::new(Self {
                listings: Mutex::new(
                    listings
                        .into_iter()
                        .rev()
                        .map(|l| {
                            l.map(|ms| ms.into_iter().map(String::from).collect())
                                .map_err(String::from)
                        })
                        .collect(),
                ),
                list_calls: AtomicUsize::new(0),
                completed_with: Mutex::new(Vec::new()),
                fail_completion,
            })
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        async fn list_models(&self) -> Result<Vec<String>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            match self.listings.lock().unwrap().pop() {
                Some(Ok(models)) => Ok(models),
                Some(Err(e)) => Err(anyhow::anyhow!(e)),
                None => Ok(Vec::new()),
            }
        }

        async fn complete(&self, model: &str, _messages: &[ChatMessage]) -> Result<String> {
            self.completed_with.lock().unwrap().push(model.to_string());
            if self.fail_completion {
                anyhow::bail!("503 Service Unavailable");
            }
            Ok(format!("answer from {}", model))
        }
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_model_policy() {
        let fallback = "openai/gpt-oss-120b";
        assert_eq!(
            pick_model("llama-3.1-8b-instant", fallback, &strings(&["llama-3.1-8b-instant", fallback])),
            Some("llama-3.1-8b-instant".to_string())
        );
        assert_eq!(
            pick_model("retired-model", fallback, &strings(&["zeta", fallback])),
            Some(fallback.to_string())
        );
        assert_eq!(
            pick_model("retired-model", fallback, &strings(&["zeta", "alpha", "mid"])),
            Some("alpha".to_string())
        );
        assert_eq!(pick_model("retired-model", fallback, &[]), None);
    }

    #[tokio::test]
    async fn test_listing_failure_uses_requested() {
        let service = ScriptedService::new(vec![Err("connection refused")], false);
        let generator = AnswerGenerator::new(service, "my-model", "openai/gpt-oss-120b");
        assert_eq!(generator.resolved_model().await, "my-model");

        let service = ScriptedService::new(vec![Err("connection refused")], false);
        let generator = AnswerGenerator::new(service, "  ", "openai/gpt-oss-120b");
        assert_eq!(generator.resolved_model().await, "openai/gpt-oss-120b");
    }

    #[tokio::test]
    async fn test_empty_listing_uses_requested() {
        let service = ScriptedService::new(vec![Ok(vec![])], false);
        let generator = AnswerGenerator::new(service, "my-model", "openai/gpt-oss-120b");
        assert_eq!(generator.resolved_model().await, "my-model");
    }

    #[tokio::test]
    async fn test_resolution_is_cached() {
        let service = ScriptedService::new(
            vec![Ok(vec!["beta", "alpha"]), Ok(vec!["my-model"])],
            false,
        );
        let generator = AnswerGenerator::new(service.clone(), "my-model", "openai/gpt-oss-120b");

        let first = generator.generate("q1").await.unwrap();
        let second = generator.generate("q2").await.unwrap();

        assert_eq!(first, "answer from alpha");
        assert_eq!(second, "answer from alpha");
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            service.completed_with.lock().unwrap().as_slice(),
            &["alpha".to_string(), "alpha".to_string()]
        );
    }

    #[tokio::test]
    async fn test_completion_failure_becomes_error_value() {
        let service = ScriptedService::new(vec![Ok(vec!["openai/gpt-oss-120b"])], true);
        let generator = AnswerGenerator::new(service, "openai/gpt-oss-120b", "openai/gpt-oss-120b");

        let err = generator
            .generate_answer("Refund window?", &[], &PromptTemplate::constrained())
            .await
            .unwrap_err();
        assert_eq!(err.model, "openai/gpt-oss-120b");
        let text = err.to_string();
        assert!(text.contains("Error generating answer"));
        assert!(text.contains("openai/gpt-oss-120b"));
        assert!(text.contains("503"));
    }
}
