//! Completion service client.
//!
//! [`CompletionService`] is the seam the answer generator talks to.
//! [`OpenAiCompatClient`] implements it for any OpenAI-compatible
//! chat-completions API (Groq by default):
//!
//! - `GET  {base_url}/models` — advertised model ids
//! - `POST {base_url}/chat/completions` — single-turn completion
//!
//! Requests carry `Authorization: Bearer <key>` and the configured timeout.
//! There are no retries; a failed call is reported to the caller once.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;

/// One chat message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A hosted LLM that can list its models and complete a conversation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Ids of the models the service currently advertises.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Generate the assistant reply to `messages` with `model`.
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

fn parse_model_list(body: &str) -> Result<Vec<String>> {
    let list: ModelList =
        serde_json::from_str(body).context("Invalid models response: expected {\"data\": [...]}")?;
    Ok(list.data.into_iter().map(|m| m.id).collect())
}

fn parse_completion(body: &str) -> Result<String> {
    let response: CompletionResponse =
        serde_json::from_str(body).context("Invalid completion response")?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("Completion response contained no message content"))
}

/// HTTP client for an OpenAI-compatible API.
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// Build a client from config, reading the key from `llm.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key variable is unset or empty.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("{} environment variable not set", config.api_key_env)
            })?;
        Self::new(
            &config.base_url,
            &api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn read_body(response: reqwest::Response, what: &str) -> Result<String> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("{} failed with HTTP {}: {}", what, status, body);
        }
        Ok(body)
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatClient {
    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;
        let body = Self::read_body(response, "Model listing").await?;
        parse_model_list(&body)
    }

    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&CompletionRequest { model, messages })
            .send()
            .await?;
        let body = Self::read_body(response, "Chat completion").await?;
        parse_completion(&body)
    }
}
