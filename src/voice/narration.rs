//! Interruptible narration and dialogue playback

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::playback::AudioPlayback;
use super::tts::{SpeechSynthesizer, SynthesisRequest};
use crate::{Error, Result};

/// Speaks text aloud with a given voice
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Synthesis engine name, used to pick voice bindings
    fn engine(&self) -> &str;

    /// Synthesize and play one piece of text
    ///
    /// Dropping the future must stop playback.
    async fn speak(&self, text: &str, emotion: &str, voice: &str) -> Result<()>;
}

/// Speaker used when synthesis is disabled
#[derive(Debug, Default)]
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    fn engine(&self) -> &str {
        "dummy"
    }

    async fn speak(&self, _text: &str, _emotion: &str, _voice: &str) -> Result<()> {
        tracing::trace!("no tts configured, staying silent");
        Ok(())
    }
}

/// Synthesizes through a [`SpeechSynthesizer`] and plays on the speakers
pub struct SynthesizedSpeaker {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: AudioPlayback,
}

impl SynthesizedSpeaker {
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, playback: AudioPlayback) -> Self {
        Self {
            synthesizer,
            playback,
        }
    }
}

#[async_trait]
impl Speaker for SynthesizedSpeaker {
    fn engine(&self) -> &str {
        self.synthesizer.name()
    }

    async fn speak(&self, text: &str, emotion: &str, voice: &str) -> Result<()> {
        tracing::debug!(voice, emotion, chars = text.len(), "speaking");

        let request = SynthesisRequest {
            text: text.to_string(),
            emotion: emotion.to_string(),
            voice: voice.to_string(),
        };

        let audio = self.synthesizer.synthesize(&request).await?;
        self.playback
            .play_bytes(&audio)
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))
    }
}

/// One piece of narration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub emotion: String,
    pub voice: String,
}

impl Segment {
    #[must_use]
    pub fn new(text: impl Into<String>, emotion: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotion: emotion.into(),
            voice: voice.into(),
        }
    }
}

/// How a narration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationOutcome {
    /// Every segment was attempted
    Completed,
    /// The listener interrupted; remaining segments were abandoned
    Skipped,
}

/// Plays segments in order until done or skipped
pub struct NarrationPlayer {
    speaker: Arc<dyn Speaker>,
    segment_timeout: Duration,
}

impl NarrationPlayer {
    #[must_use]
    pub fn new(speaker: Arc<dyn Speaker>, segment_timeout: Duration) -> Self {
        Self {
            speaker,
            segment_timeout,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &str {
        self.speaker.engine()
    }

    /// Play `segments`, abandoning the rest as soon as `skip` resolves
    ///
    /// `skip` is armed once for the whole narration, so one interrupt
    /// cancels the current segment and everything queued after it. Each
    /// segment gets its own timeout; a failed segment is logged and the
    /// next one still plays.
    pub async fn play<S>(&self, segments: &[Segment], skip: S) -> NarrationOutcome
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(skip);

        for (index, segment) in segments.iter().enumerate() {
            let spoken = tokio::time::timeout(
                self.segment_timeout,
                self.speaker
                    .speak(&segment.text, &segment.emotion, &segment.voice),
            );

            tokio::select! {
                biased;
                () = &mut skip => {
                    tracing::debug!(segment = index, remaining = segments.len() - index, "narration skipped");
                    return NarrationOutcome::Skipped;
                }
                result = spoken => match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(segment = index, error = %e, "failed to speak segment");
                    }
                    Err(_) => {
                        tracing::warn!(segment = index, timeout_secs = self.segment_timeout.as_secs(), "segment timed out");
                    }
                },
            }
        }

        NarrationOutcome::Completed
    }
}
