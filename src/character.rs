//! Interviewable characters and their conversations

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::{CharacterReply, DialogueGenerator};
use crate::scenario::{Solution, VoiceBinding};
use crate::{Error, Result};

/// Chat role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String, emotion: Option<String>) -> Self {
        Self {
            role,
            content,
            emotion,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only message history between the detective and one character
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// A character from the scenario roster
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Character {
    pub name: String,
    pub personality: String,
    #[serde(default)]
    pub knowledge: Vec<String>,
    /// Whether the character is instructed to tell the truth
    #[serde(default)]
    pub reliable: bool,
    #[serde(default)]
    pub tts: Vec<VoiceBinding>,

    #[serde(skip)]
    pub conversation: Conversation,
}

impl Character {
    /// Ask the character a question and record the exchange
    ///
    /// The first question opens the conversation with a system preamble
    /// describing the character and the case. On failure the question stays
    /// in the history.
    ///
    /// # Errors
    ///
    /// Returns error if generation fails or exceeds `timeout`
    pub async fn ask(
        &mut self,
        question: &str,
        solution: &Solution,
        generator: &dyn DialogueGenerator,
        timeout: Duration,
    ) -> Result<CharacterReply> {
        let content = if self.conversation.is_empty() {
            let preamble = self.preamble(solution);
            self.conversation
                .push(Message::new(Role::System, preamble, None));
            format!("Detective's question: {question}")
        } else {
            format!("Detective's follow up question: {question}")
        };
        self.conversation.push(Message::new(Role::User, content, None));

        tracing::debug!(
            character = %self.name,
            generator = generator.name(),
            turns = self.conversation.len(),
            "asking character"
        );

        let reply = tokio::time::timeout(timeout, generator.reply(self.conversation.messages()))
            .await
            .map_err(|_| Error::Timeout("dialogue generation"))??;

        self.conversation.push(Message::new(
            Role::Assistant,
            reply.response.clone(),
            Some(reply.emotion.clone()),
        ));

        Ok(reply)
    }

    /// System preamble embedding the character profile and case facts
    fn preamble(&self, solution: &Solution) -> String {
        let honesty = if self.reliable {
            "You are generally truthful and helpful."
        } else {
            "You may hide facts, dodge questions or mislead the detective, but never break character."
        };

        let knowledge = if self.knowledge.is_empty() {
            "nothing in particular".to_string()
        } else {
            self.knowledge.join("; ")
        };

        format!(
            "You are {name}, a character in a murder mystery being questioned by a detective.\n\
             \n\
             CHARACTER:\n\
             - Name: {name}\n\
             - Personality: {personality}\n\
             - {honesty}\n\
             \n\
             THE CASE:\n\
             - The body was found in the {location}\n\
             - The weapon was the {weapon}\n\
             - The killer is {killer}\n\
             - What you know: {knowledge}\n\
             \n\
             RULES:\n\
             - Stay in character and never mention that this is a game\n\
             - Answer from your own personality and knowledge, briefly\n\
             - If you do not know something, say so in character\n\
             - Reply only with JSON: {{\"response\": string, \"emotion\": string}}",
            name = self.name,
            personality = self.personality,
            location = solution.location,
            weapon = solution.weapon,
            killer = solution.killer,
        )
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Echo {
        delay: Duration,
    }

    #[async_trait]
    impl DialogueGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn check_available(&self) -> Result<()> {
            Ok(())
        }

        async fn reply(&self, conversation: &[Message]) -> Result<CharacterReply> {
            tokio::time::sleep(self.delay).await;
            Ok(CharacterReply {
                response: format!("heard {} messages", conversation.len()),
                emotion: "bored".to_string(),
            })
        }
    }

    fn solution() -> Solution {
        Solution {
            killer: "Mustard".to_string(),
            weapon: "candlestick".to_string(),
            location: "dining room".to_string(),
        }
    }

    fn butler() -> Character {
        Character {
            name: "Mr Green".to_string(),
            personality: "Nervous butler".to_string(),
            knowledge: vec!["Polished the candlestick at eight".to_string()],
            reliable: true,
            tts: Vec::new(),
            conversation: Conversation::default(),
        }
    }

    #[tokio::test]
    async fn test_first_question_opens_with_preamble() {
        let mut character = butler();
        let generator = Echo {
            delay: Duration::ZERO,
        };

        let reply = character
            .ask("Where were you?", &solution(), &generator, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reply.response, "heard 2 messages");

        let messages = character.conversation.messages();
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Mr Green"));
        assert!(messages[0].content.contains("Polished the candlestick at eight"));
        assert!(messages[0].content.contains("generally truthful"));
        assert_eq!(messages[1].content, "Detective's question: Where were you?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].emotion.as_deref(), Some("bored"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_question() {
        let mut character = butler();
        let generator = Echo {
            delay: Duration::from_secs(60),
        };

        let result = character
            .ask("Anything else?", &solution(), &generator, Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(character.conversation.len(), 2);
        assert_eq!(character.conversation.messages()[1].role, Role::User);
    }
}
