//! Configuration management for gofigure
//!
//! Every setting resolves as environment variable, then config file, then
//! built-in default.

pub mod file;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use self::file::GofigureConfigFile;
use crate::voice::{MusicSettings, RecognitionSettings, VoiceTiming};

/// Dialogue generation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    OpenAi,
}

impl LlmProvider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Ollama server URL
    pub host: String,
    /// Upper bound for one dialogue turn
    pub timeout: Duration,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsConfig {
    pub enabled: bool,
    /// "google", "openai" or "dummy"
    pub engine: String,
    /// Model for engines that take one (`OpenAI`)
    pub model: String,
    /// Upper bound for one spoken segment
    pub playback_timeout: Duration,
}

/// Speech recognition configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SttConfig {
    pub enabled: bool,
    /// "google", "whisper" or "dummy"
    pub provider: String,
    pub language_code: String,
    pub sample_rate: u32,
    pub chunk_interval: Duration,
    pub request_timeout: Duration,
    pub grace: Duration,
    pub session_timeout: Duration,
}

impl SttConfig {
    /// Recognition parameters for one session
    #[must_use]
    pub fn recognition_settings(&self) -> RecognitionSettings {
        let model = if self.provider == "whisper" {
            "whisper-1"
        } else {
            "latest_long"
        };

        RecognitionSettings {
            sample_rate: self.sample_rate,
            language_code: self.language_code.clone(),
            auto_punctuation: true,
            model: model.to_string(),
        }
    }

    #[must_use]
    pub const fn timing(&self) -> VoiceTiming {
        VoiceTiming {
            chunk_interval: self.chunk_interval,
            request_timeout: self.request_timeout,
            grace: self.grace,
            session_timeout: self.session_timeout,
        }
    }
}

/// Background music configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MusicConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Loudness as a power of two
    pub volume: f32,
}

impl MusicConfig {
    #[must_use]
    pub fn settings(&self) -> MusicSettings {
        MusicSettings {
            path: self.path.clone(),
            volume: self.volume,
        }
    }
}

/// API keys
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub google: Option<String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &redact(self.openai.as_deref()))
            .field("google", &redact(self.google.as_deref()))
            .finish()
    }
}

/// Show whether a secret is set without revealing it
#[must_use]
pub fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "[set]",
        _ => "[not set]",
    }
}

/// Effective gofigure configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub stt: SttConfig,
    pub music: MusicConfig,
    pub api_keys: ApiKeys,
    /// Print character replies even when they are spoken
    pub show_responses: bool,
    /// Config file the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment and the config file
    #[must_use]
    pub fn load() -> Self {
        let (fc, source) = file::load_config_file();
        let mut config = Self::from_sources(fc, |key| std::env::var(key).ok());
        config.source = source;
        config
    }

    /// Resolve settings from a parsed config file and an environment lookup
    pub fn from_sources<F>(fc: GofigureConfigFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let env_bool = |key: &str| env(key).and_then(|v| parse_bool(&v));
        let env_u64 = |key: &str| {
            env(key).and_then(|v| {
                v.trim()
                    .parse::<u64>()
                    .inspect_err(|e| tracing::warn!(key, error = %e, "ignoring invalid number"))
                    .ok()
            })
        };

        // LLM (env > toml > default)
        let provider_name = env("GOFIGURE_LLM_PROVIDER").or(fc.llm.provider);
        let provider = provider_name.as_deref().map_or(LlmProvider::Ollama, |name| {
            LlmProvider::parse(name).unwrap_or_else(|| {
                tracing::warn!(provider = name, "unknown LLM provider, using ollama");
                LlmProvider::Ollama
            })
        });
        let default_model = match provider {
            LlmProvider::Ollama => "llama3.2",
            LlmProvider::OpenAi => "gpt-4o-mini",
        };
        let llm = LlmConfig {
            provider,
            model: env("GOFIGURE_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| default_model.to_string()),
            host: env("GOFIGURE_OLLAMA_HOST")
                .or(fc.llm.host)
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            timeout: Duration::from_secs(
                env_u64("GOFIGURE_LLM_TIMEOUT")
                    .or(fc.llm.timeout_secs)
                    .unwrap_or(50),
            ),
        };

        let tts = TtsConfig {
            enabled: env_bool("GOFIGURE_TTS_ENABLED")
                .or(fc.tts.enabled)
                .unwrap_or(true),
            engine: env("GOFIGURE_TTS_ENGINE")
                .or(fc.tts.engine)
                .unwrap_or_else(|| "google".to_string())
                .to_lowercase(),
            model: fc
                .tts
                .model
                .unwrap_or_else(|| "gpt-4o-mini-tts".to_string()),
            playback_timeout: Duration::from_secs(fc.tts.playback_timeout_secs.unwrap_or(60)),
        };

        let stt = SttConfig {
            enabled: env_bool("GOFIGURE_STT_ENABLED")
                .or(fc.stt.enabled)
                .unwrap_or(true),
            provider: env("GOFIGURE_STT_PROVIDER")
                .or(fc.stt.provider)
                .unwrap_or_else(|| "google".to_string())
                .to_lowercase(),
            language_code: env("GOFIGURE_LANGUAGE_CODE")
                .or(fc.stt.language_code)
                .unwrap_or_else(|| "en-US".to_string()),
            sample_rate: nonzero("sample_rate", fc.stt.sample_rate, crate::voice::SAMPLE_RATE),
            chunk_interval: Duration::from_millis(nonzero(
                "chunk_interval_ms",
                fc.stt.chunk_interval_ms,
                2000,
            )),
            request_timeout: Duration::from_secs(nonzero(
                "request_timeout_secs",
                fc.stt.request_timeout_secs,
                15,
            )),
            grace: Duration::from_millis(fc.stt.grace_ms.unwrap_or(2000)),
            session_timeout: Duration::from_secs(nonzero(
                "session_timeout_secs",
                fc.stt.session_timeout_secs,
                30,
            )),
        };

        let music = MusicConfig {
            enabled: env_bool("GOFIGURE_MUSIC_ENABLED")
                .or(fc.music.enabled)
                .unwrap_or(true),
            path: env("GOFIGURE_MUSIC_PATH")
                .map(PathBuf::from)
                .or(fc.music.path)
                .unwrap_or_else(|| PathBuf::from("data/audio/background.mp3")),
            volume: fc
                .music
                .volume
                .filter(|v| v.is_finite())
                .unwrap_or(-6.0),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
            google: env("GOOGLE_API_KEY").or(fc.api_keys.google),
        };

        Self {
            llm,
            tts,
            stt,
            music,
            api_keys,
            show_responses: fc.game.show_responses.unwrap_or(false),
            source: None,
        }
    }
}

/// `value` or `default`, treating zero as unset
fn nonzero<T>(key: &str, value: Option<T>, default: T) -> T
where
    T: Copy + Default + PartialEq + fmt::Display,
{
    match value {
        Some(v) if v == T::default() => {
            tracing::warn!(key, fallback = %default, "ignoring zero setting");
            default
        }
        Some(v) => v,
        None => default,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(path) => writeln!(f, "# loaded from {}", path.display())?,
            None => writeln!(f, "# no config file, defaults and environment only")?,
        }
        writeln!(f, "[llm]")?;
        writeln!(f, "provider = \"{}\"", self.llm.provider.as_str())?;
        writeln!(f, "model = \"{}\"", self.llm.model)?;
        writeln!(f, "host = \"{}\"", self.llm.host)?;
        writeln!(f, "timeout_secs = {}", self.llm.timeout.as_secs())?;
        writeln!(f, "\n[tts]")?;
        writeln!(f, "enabled = {}", self.tts.enabled)?;
        writeln!(f, "engine = \"{}\"", self.tts.engine)?;
        writeln!(f, "model = \"{}\"", self.tts.model)?;
        writeln!(f, "playback_timeout_secs = {}", self.tts.playback_timeout.as_secs())?;
        writeln!(f, "\n[stt]")?;
        writeln!(f, "enabled = {}", self.stt.enabled)?;
        writeln!(f, "provider = \"{}\"", self.stt.provider)?;
        writeln!(f, "language_code = \"{}\"", self.stt.language_code)?;
        writeln!(f, "sample_rate = {}", self.stt.sample_rate)?;
        writeln!(f, "chunk_interval_ms = {}", self.stt.chunk_interval.as_millis())?;
        writeln!(f, "request_timeout_secs = {}", self.stt.request_timeout.as_secs())?;
        writeln!(f, "grace_ms = {}", self.stt.grace.as_millis())?;
        writeln!(f, "session_timeout_secs = {}", self.stt.session_timeout.as_secs())?;
        writeln!(f, "\n[music]")?;
        writeln!(f, "enabled = {}", self.music.enabled)?;
        writeln!(f, "path = \"{}\"", self.music.path.display())?;
        writeln!(f, "volume = {:.1}", self.music.volume)?;
        writeln!(f, "\n[api_keys]")?;
        writeln!(f, "openai = \"{}\"", redact(self.api_keys.openai.as_deref()))?;
        writeln!(f, "google = \"{}\"", redact(self.api_keys.google.as_deref()))?;
        writeln!(f, "\n[game]")?;
        write!(f, "show_responses = {}", self.show_responses)
    }
}
