//! Ollama chat backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CharacterReply, DialogueGenerator, parse_reply};
use crate::character::Message;
use crate::{Error, Result};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: &'a str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Generates replies with a local Ollama server
pub struct OllamaGenerator {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for `model` served at `host`
    #[must_use]
    pub fn new(host: &str, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            model,
        }
    }
}

/// Ollama reports tags as `name:tag`; a bare model name means `latest`
fn model_matches(tag: &str, model: &str) -> bool {
    tag == model || (!model.contains(':') && tag == format!("{model}:latest"))
}

#[async_trait]
impl DialogueGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn check_available(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Generation(format!("Ollama returned {status}")));
        }

        let tags: TagsResponse = response.json().await?;
        if tags.models.iter().any(|m| model_matches(&m.name, &self.model)) {
            tracing::debug!(model = %self.model, "ollama model available");
            Ok(())
        } else {
            Err(Error::Generation(format!(
                "model {} not found, run `ollama pull {}`",
                self.model, self.model
            )))
        }
    }

    async fn reply(&self, conversation: &[Message]) -> Result<CharacterReply> {
        let request = ChatRequest {
            model: &self.model,
            messages: conversation
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Ollama request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Ollama API error");
            return Err(Error::Generation(format!("Ollama error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await?;
        parse_reply(&result.message.content)
    }
}
