//! gofigure - a voice-driven murder mystery
//!
//! The detective interviews LLM-played characters from a scenario file, by
//! typing or push-to-talk, and makes one final accusation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Game loop                       │
//! │   Commands  │  Matcher  │  Interviews  │  Verdict   │
//! └──────┬─────────────────┬───────────────────┬────────┘
//!        │                 │                   │
//! ┌──────▼──────┐   ┌──────▼──────┐   ┌────────▼───────┐
//! │ Voice input │   │  Narration  │   │   Dialogue     │
//! │ capture/STT │   │  TTS/play   │   │ Ollama/OpenAI  │
//! └─────────────┘   └─────────────┘   └────────────────┘
//! ```

pub mod backends;
pub mod character;
pub mod config;
pub mod error;
pub mod game;
pub mod llm;
pub mod scenario;
pub mod voice;

pub use character::{Character, Conversation, Message, Role};
pub use config::Config;
pub use error::{Error, Result};
pub use game::{Game, GameOptions, GameOutcome, Terminal};
pub use scenario::{Accusation, Scenario, Solution, Verdict, VoiceBinding};
