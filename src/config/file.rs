//! TOML configuration file loading
//!
//! Looks for `./gofigure.toml` first, then `~/.config/gofigure/config.toml`.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "gofigure.toml";

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GofigureConfigFile {
    /// Dialogue generation
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech synthesis
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Speech recognition
    #[serde(default)]
    pub stt: SttFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Background music
    #[serde(default)]
    pub music: MusicFileConfig,

    #[serde(default)]
    pub game: GameFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// "ollama" or "openai"
    pub provider: Option<String>,

    /// Model identifier (e.g. "llama3.2")
    pub model: Option<String>,

    /// Ollama server URL
    pub host: Option<String>,

    /// Per-turn generation timeout
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    pub enabled: Option<bool>,

    /// "google", "openai" or "dummy"
    pub engine: Option<String>,

    /// `OpenAI` speech model (e.g. "gpt-4o-mini-tts")
    pub model: Option<String>,

    /// Upper bound for one spoken segment
    pub playback_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    pub enabled: Option<bool>,

    /// "google", "whisper" or "dummy"
    pub provider: Option<String>,

    pub language_code: Option<String>,
    pub sample_rate: Option<u32>,
    pub chunk_interval_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub grace_ms: Option<u64>,
    pub session_timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub google: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MusicFileConfig {
    pub enabled: Option<bool>,

    /// WAV or MP3 file to loop
    pub path: Option<PathBuf>,

    /// Loudness as a power of two (-6 plays at 1/64 amplitude)
    pub volume: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GameFileConfig {
    /// Print character replies even when they are spoken
    pub show_responses: Option<bool>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the contents are not valid TOML for this schema
pub fn parse_config_file(content: &str) -> Result<GofigureConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the first standard path that exists
///
/// Returns `GofigureConfigFile::default()` if no file exists or it can't be parsed.
pub fn load_config_file() -> (GofigureConfigFile, Option<PathBuf>) {
    let Some(path) = config_file_candidates().into_iter().find(|p| p.exists()) else {
        tracing::debug!("no config file found, using defaults");
        return (GofigureConfigFile::default(), None);
    };

    (load_config_file_from(&path), Some(path))
}

/// Load a specific config file, falling back to defaults on any error
pub fn load_config_file_from(path: &Path) -> GofigureConfigFile {
    match std::fs::read_to_string(path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GofigureConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GofigureConfigFile::default()
        }
    }
}

/// Config file locations in lookup order
#[must_use]
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(path) = config_file_path() {
        candidates.push(path);
    }
    candidates
}

/// Return the user config file path: `~/.config/gofigure/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("gofigure").join("config.toml"))
}
