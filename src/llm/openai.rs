//! `OpenAI` chat completions backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CharacterReply, DialogueGenerator, parse_reply};
use crate::character::Message;
use crate::{Error, Result};

const API_BASE: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Generates replies with the `OpenAI` chat completions API
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    /// Create a new `OpenAI` generator
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for dialogue generation".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl DialogueGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn check_available(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{API_BASE}/models/{}", self.model))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            Err(Error::Generation(format!(
                "model {} unavailable ({status})",
                self.model
            )))
        }
    }

    async fn reply(&self, conversation: &[Message]) -> Result<CharacterReply> {
        let request = CompletionRequest {
            model: &self.model,
            messages: conversation
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{API_BASE}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "OpenAI request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "OpenAI API error");
            return Err(Error::Generation(format!("OpenAI error {status}: {body}")));
        }

        let result: CompletionResponse = response.json().await?;
        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Generation("no choices returned".to_string()))?;

        parse_reply(&content)
    }
}
