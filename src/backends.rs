//! Backend selection from configuration
//!
//! A configured backend that cannot be built (missing key, no audio device)
//! is logged and replaced by its dummy counterpart so the game stays
//! playable in text mode. The dialogue generator has no dummy; failing to
//! build it is an error.

use std::sync::Arc;

use crate::config::{Config, LlmProvider};
use crate::llm::{DialogueGenerator, OllamaGenerator, OpenAiGenerator};
use crate::voice::{
    AudioPlayback, BackgroundMusic, DummyRecognizer, GoogleRecognizer, GoogleSynthesizer, MicrophoneDevice,
    NarrationPlayer, OpenAiSynthesizer, SilentSpeaker, Speaker, SpeechRecognizer,
    SpeechSynthesizer, SynthesizedSpeaker, VoiceInput, WhisperRecognizer,
};
use crate::{Error, Result};

/// Build the dialogue generator for the configured provider
///
/// # Errors
///
/// Returns error if the provider needs an API key that is not set
pub fn dialogue_generator(config: &Config) -> Result<Arc<dyn DialogueGenerator>> {
    let generator: Arc<dyn DialogueGenerator> = match config.llm.provider {
        LlmProvider::Ollama => Arc::new(OllamaGenerator::new(
            &config.llm.host,
            config.llm.model.clone(),
        )),
        LlmProvider::OpenAi => Arc::new(OpenAiGenerator::new(
            config.api_keys.openai.clone().unwrap_or_default(),
            config.llm.model.clone(),
        )?),
    };

    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        "dialogue generator selected"
    );
    Ok(generator)
}

/// Build the speech synthesizer for the configured engine
///
/// Returns `None` when synthesis is disabled or the engine is "dummy".
///
/// # Errors
///
/// Returns error if the engine is unknown or its API key is missing
pub fn speech_synthesizer(config: &Config) -> Result<Option<Arc<dyn SpeechSynthesizer>>> {
    if !config.tts.enabled {
        return Ok(None);
    }

    let synthesizer: Arc<dyn SpeechSynthesizer> = match config.tts.engine.as_str() {
        "dummy" => return Ok(None),
        "google" => Arc::new(GoogleSynthesizer::new(
            config.api_keys.google.clone().unwrap_or_default(),
        )?),
        "openai" => Arc::new(OpenAiSynthesizer::new(
            config.api_keys.openai.clone().unwrap_or_default(),
            config.tts.model.clone(),
        )?),
        other => {
            return Err(Error::Config(format!("unknown TTS engine '{other}'")));
        }
    };
    Ok(Some(synthesizer))
}

/// Build the speaker, falling back to silence
#[must_use]
pub fn speaker(config: &Config) -> Arc<dyn Speaker> {
    let synthesizer = match speech_synthesizer(config) {
        Ok(Some(synthesizer)) => synthesizer,
        Ok(None) => {
            tracing::info!("speech synthesis disabled");
            return Arc::new(SilentSpeaker);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to set up speech synthesis, continuing without it");
            return Arc::new(SilentSpeaker);
        }
    };

    match AudioPlayback::new() {
        Ok(playback) => {
            tracing::info!(engine = synthesizer.name(), "speech synthesis enabled");
            Arc::new(SynthesizedSpeaker::new(synthesizer, playback))
        }
        Err(e) => {
            tracing::error!(error = %e, "no audio output, continuing without speech");
            Arc::new(SilentSpeaker)
        }
    }
}

/// Narration player over the configured speaker
#[must_use]
pub fn narration_player(config: &Config) -> NarrationPlayer {
    NarrationPlayer::new(speaker(config), config.tts.playback_timeout)
}

/// Build the speech recognizer, falling back to the dummy one
#[must_use]
pub fn speech_recognizer(config: &Config) -> Arc<dyn SpeechRecognizer> {
    let built: Result<Arc<dyn SpeechRecognizer>> = match config.stt.provider.as_str() {
        "dummy" => Ok(Arc::new(DummyRecognizer)),
        "google" => GoogleRecognizer::new(config.api_keys.google.clone().unwrap_or_default())
            .map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>),
        "whisper" => WhisperRecognizer::new(
            config.api_keys.openai.clone().unwrap_or_default(),
            config.stt.recognition_settings().model,
        )
        .map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>),
        other => Err(Error::Config(format!("unknown STT provider '{other}'"))),
    };

    built.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to set up speech recognition, using dummy recognizer");
        Arc::new(DummyRecognizer)
    })
}

/// Push-to-talk input, when enabled
///
/// Returns `None` when recognition is disabled or `text_only` was requested,
/// or when only the dummy recognizer is available.
#[must_use]
pub fn voice_input(config: &Config, text_only: bool) -> Option<VoiceInput> {
    if text_only || !config.stt.enabled {
        tracing::info!("voice input disabled, using text input");
        return None;
    }

    let recognizer = speech_recognizer(config);
    if recognizer.provider() == "dummy" {
        tracing::info!("no speech recognizer available, using text input");
        return None;
    }

    tracing::info!(provider = recognizer.provider(), "voice input enabled");
    Some(VoiceInput::new(
        Box::new(MicrophoneDevice),
        recognizer,
        config.stt.recognition_settings(),
        config.stt.timing(),
    ))
}

/// Start the background music loop, when enabled
///
/// Returns `None` when music is disabled by configuration or `muted`, or when
/// the track cannot be loaded.
#[must_use]
pub fn background_music(config: &Config, muted: bool) -> Option<BackgroundMusic> {
    if muted || !config.music.enabled {
        tracing::info!("background music disabled");
        return None;
    }
    BackgroundMusic::start(&config.music.settings())
}
