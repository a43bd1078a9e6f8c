//! Speech-to-text (STT) processing

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::capture::pcm_to_wav;
use crate::{Error, Result};

/// Session-wide recognition parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    pub sample_rate: u32,
    pub language_code: String,
    pub auto_punctuation: bool,
    /// Provider model hint (e.g. "latest_long")
    pub model: String,
}

/// One chunk of audio to transcribe
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Little-endian 16-bit mono PCM
    pub audio: Vec<u8>,
    pub sample_rate: u32,
    pub language_code: String,
    pub auto_punctuation: bool,
    pub model: String,
}

impl RecognitionRequest {
    #[must_use]
    pub fn new(audio: Vec<u8>, settings: &RecognitionSettings) -> Self {
        Self {
            audio,
            sample_rate: settings.sample_rate,
            language_code: settings.language_code.clone(),
            auto_punctuation: settings.auto_punctuation,
            model: settings.model.clone(),
        }
    }
}

/// A candidate transcript
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

/// One recognized segment, alternatives ordered best first
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

impl RecognitionResult {
    /// The highest-confidence alternative
    #[must_use]
    pub fn best(self) -> Option<Alternative> {
        self.alternatives.into_iter().next()
    }
}

/// Transcribes chunks of PCM audio
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Provider name for logs
    fn provider(&self) -> &str;

    /// Transcribe one chunk
    async fn recognize(&self, request: RecognitionRequest) -> Result<Vec<RecognitionResult>>;
}

/// Recognizer used when speech input is disabled
#[derive(Debug, Default)]
pub struct DummyRecognizer;

#[async_trait]
impl SpeechRecognizer for DummyRecognizer {
    fn provider(&self) -> &str {
        "dummy"
    }

    async fn recognize(&self, _request: RecognitionRequest) -> Result<Vec<RecognitionResult>> {
        Ok(Vec::new())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRecognizeRequest<'a> {
    config: GoogleRecognitionConfig<'a>,
    audio: GoogleAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
    model: &'a str,
}

#[derive(Serialize)]
struct GoogleAudio {
    content: String,
}

#[derive(Deserialize)]
struct GoogleRecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

/// Google Cloud Speech-to-Text over REST
pub struct GoogleRecognizer {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleRecognizer {
    /// Create a new Google recognizer
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Google API key required for speech recognition".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleRecognizer {
    fn provider(&self) -> &str {
        "google"
    }

    async fn recognize(&self, request: RecognitionRequest) -> Result<Vec<RecognitionResult>> {
        tracing::debug!(audio_bytes = request.audio.len(), "starting Google recognition");

        let body = GoogleRecognizeRequest {
            config: GoogleRecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: request.sample_rate,
                language_code: &request.language_code,
                enable_automatic_punctuation: request.auto_punctuation,
                model: &request.model,
            },
            audio: GoogleAudio {
                content: BASE64.encode(&request.audio),
            },
        };

        let response = self
            .client
            .post("https://speech.googleapis.com/v1/speech:recognize")
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Recognition(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google STT API error");
            return Err(Error::Recognition(format!("Google STT error {status}: {body}")));
        }

        let result: GoogleRecognizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Recognition(e.to_string()))?;

        tracing::debug!(results = result.results.len(), "recognition complete");
        Ok(result.results)
    }
}

/// Response from OpenAI Whisper transcription API
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

/// `OpenAI` Whisper transcription
///
/// Whisper returns a single transcript without scores, reported as one
/// result with one alternative of full confidence.
pub struct WhisperRecognizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl WhisperRecognizer {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
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
impl SpeechRecognizer for WhisperRecognizer {
    fn provider(&self) -> &str {
        "whisper"
    }

    async fn recognize(&self, request: RecognitionRequest) -> Result<Vec<RecognitionResult>> {
        tracing::debug!(audio_bytes = request.audio.len(), "starting Whisper transcription");

        let wav = pcm_to_wav(&request.audio, request.sample_rate)?;
        let language = request
            .language_code
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string();

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Recognition(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language);

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Recognition(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Recognition(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Recognition(e.to_string()))?;

        if result.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![RecognitionResult {
            alternatives: vec![Alternative {
                transcript: result.text,
                confidence: 1.0,
            }],
        }])
    }
}
