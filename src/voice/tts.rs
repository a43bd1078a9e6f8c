//! Text-to-speech (TTS) processing

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Output sample rate requested from synthesis engines that take one
pub const SYNTHESIS_SAMPLE_RATE: u32 = 44100;

/// Voice used by Google when a speaker has no binding
const GOOGLE_DEFAULT_VOICE: &str = "en-GB-Chirp3-HD-Charon";

/// Voice used by `OpenAI` when a speaker has no binding
const OPENAI_DEFAULT_VOICE: &str = "alloy";

/// Text to synthesize and how to voice it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    /// Delivery hint such as "nervous" or "warm and welcoming"
    pub emotion: String,
    /// Engine-specific voice model; empty selects the engine default
    pub voice: String,
}

/// Synthesizes speech from text
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Engine name, matched against scenario voice bindings
    fn name(&self) -> &str;

    /// Synthesize to decodable audio bytes (WAV or MP3)
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;
}

/// Language code from a voice model id such as `en-GB-Chirp3-HD-Charon`
///
/// Ids with fewer than three hyphen-separated parts are returned unchanged.
#[must_use]
pub fn language_code(model: &str) -> String {
    let parts: Vec<&str> = model.split('-').collect();
    if parts.len() < 3 {
        return model.to_string();
    }
    format!("{}-{}", parts[0], parts[1])
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeRequest<'a> {
    input: GoogleInput<'a>,
    voice: GoogleVoice<'a>,
    audio_config: GoogleAudioConfig,
}

#[derive(Serialize)]
struct GoogleInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleVoice<'a> {
    language_code: String,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAudioConfig {
    audio_encoding: &'static str,
    sample_rate_hertz: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeResponse {
    audio_content: String,
}

/// Google Cloud Text-to-Speech over REST (LINEAR16 WAV output)
pub struct GoogleSynthesizer {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleSynthesizer {
    /// Create a new Google synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Google API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSynthesizer {
    fn name(&self) -> &str {
        "google"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let voice = if request.voice.is_empty() {
            GOOGLE_DEFAULT_VOICE
        } else {
            request.voice.as_str()
        };

        // Google ignores delivery prompts for now; the hint is only logged
        tracing::debug!(voice, emotion = %request.emotion, "synthesizing with Google");

        let body = GoogleSynthesizeRequest {
            input: GoogleInput {
                text: &request.text,
            },
            voice: GoogleVoice {
                language_code: language_code(voice),
                name: voice,
            },
            audio_config: GoogleAudioConfig {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: SYNTHESIS_SAMPLE_RATE,
            },
        };

        let response = self
            .client
            .post("https://texttospeech.googleapis.com/v1/text:synthesize")
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("Google TTS error {status}: {body}")));
        }

        let result: GoogleSynthesizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        BASE64
            .decode(result.audio_content)
            .map_err(|e| Error::Synthesis(format!("invalid audio content: {e}")))
    }
}

/// `OpenAI` speech API (MP3 output)
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiSynthesizer {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        #[derive(Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            instructions: Option<String>,
        }

        let voice = if request.voice.is_empty() {
            OPENAI_DEFAULT_VOICE
        } else {
            request.voice.as_str()
        };

        let body = SpeechRequest {
            model: &self.model,
            input: &request.text,
            voice,
            instructions: (!request.emotion.is_empty())
                .then(|| format!("Speak in this manner: {}", request.emotion)),
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;
        Ok(audio.to_vec())
    }
}
