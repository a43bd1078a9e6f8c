//! Dialogue generation
//!
//! Characters answer through a language model. Each backend implements
//! [`DialogueGenerator`] and returns a [`CharacterReply`] parsed from the
//! model's JSON answer.

mod ollama;
mod openai;

use async_trait::async_trait;
use serde::Deserialize;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

use crate::character::Message;
use crate::{Error, Result};

/// A character's answer and the emotion it was delivered with
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacterReply {
    pub response: String,
    #[serde(default)]
    pub emotion: String,
}

/// Produces the next in-character reply for a conversation
#[async_trait]
pub trait DialogueGenerator: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Verify the backend is reachable and the configured model exists
    async fn check_available(&self) -> Result<()>;

    /// Generate the reply to the last message of `conversation`
    async fn reply(&self, conversation: &[Message]) -> Result<CharacterReply>;
}

/// Parse a model answer into a [`CharacterReply`]
///
/// Models occasionally wrap the JSON in code fences or add chatter around
/// it, so only the outermost `{...}` object is decoded.
///
/// # Errors
///
/// Returns error if no JSON object is found or the response text is empty
pub fn parse_reply(content: &str) -> Result<CharacterReply> {
    let start = content.find('{');
    let end = content.rfind('}');

    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            tracing::warn!(content, "model answer contains no JSON object");
            return Err(Error::Generation("reply is not JSON".to_string()));
        }
    };

    let reply: CharacterReply = serde_json::from_str(json).map_err(|e| {
        tracing::warn!(error = %e, content, "failed to decode model answer");
        Error::Generation(format!("malformed reply: {e}"))
    })?;

    if reply.response.trim().is_empty() {
        return Err(Error::Generation("empty reply".to_string()));
    }

    Ok(reply)
}
