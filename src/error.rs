//! Error types for gofigure

use thiserror::Error;

/// Result type alias for gofigure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a mystery
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Scenario file could not be loaded or is incomplete
    #[error("scenario error: {0}")]
    Scenario(String),

    /// Capture device failed to open or start
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Audio decode or playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// One recognition request failed
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// Synthesis or playback of one segment failed
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Dialogue generation failed or produced an unusable reply
    #[error("generation failed: {0}")]
    Generation(String),

    /// Voice session deadline elapsed without any transcript
    #[error("voice input timed out")]
    VoiceInputTimeout,

    /// Name fragment matched nobody on the roster
    #[error("character not found: {0}")]
    CharacterNotFound(String),

    /// A backend call exceeded its deadline
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
