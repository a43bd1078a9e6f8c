//! Push-to-talk voice input
//!
//! One request walks `Idle → Listening → Draining → Finished` exactly once:
//! capture and chunked recognition run until the stop signal or the session
//! deadline, then trailing transcripts are collected for a short grace
//! window before the utterance is frozen.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::capture::{CaptureController, CaptureDevice};
use super::scheduler::ChunkScheduler;
use super::stt::{RecognitionSettings, SpeechRecognizer};
use super::transcript::TranscriptAccumulator;
use crate::{Error, Result};

/// Timing for voice-input sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTiming {
    /// How often pending audio is submitted
    pub chunk_interval: Duration,
    /// Upper bound for one recognition request
    pub request_timeout: Duration,
    /// How long to keep collecting transcripts after stop
    pub grace: Duration,
    /// Hard limit for one recording
    pub session_timeout: Duration,
}

impl Default for VoiceTiming {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
            grace: Duration::from_secs(2),
            session_timeout: Duration::from_secs(30),
        }
    }
}

/// Where a voice-input request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Listening,
    Draining,
    Finished,
}

/// Why listening ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    User,
    Deadline,
}

struct Listening {
    cancel: CancellationToken,
    results: mpsc::UnboundedReceiver<String>,
    scheduler: JoinHandle<()>,
}

/// Turns one push-to-talk recording into an utterance
pub struct VoiceInput {
    capture: CaptureController,
    recognizer: Arc<dyn SpeechRecognizer>,
    settings: RecognitionSettings,
    timing: VoiceTiming,
    state: VoiceState,
    listening: Option<Listening>,
}

impl VoiceInput {
    #[must_use]
    pub fn new(
        device: Box<dyn CaptureDevice>,
        recognizer: Arc<dyn SpeechRecognizer>,
        settings: RecognitionSettings,
        timing: VoiceTiming,
    ) -> Self {
        let capture = CaptureController::new(device, settings.sample_rate);
        Self {
            capture,
            recognizer,
            settings,
            timing,
            state: VoiceState::Idle,
            listening: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> VoiceState {
        self.state
    }

    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.capture.is_active()
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        self.recognizer.provider()
    }

    /// Record until `stop` resolves or the session deadline passes
    ///
    /// Returns the utterance with punctuation stripped; an empty string
    /// means no speech was recognized. When the deadline passes, whatever was
    /// recognized so far is returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the microphone cannot be opened,
    /// or `Error::VoiceInputTimeout` if the deadline passed with nothing
    /// recognized
    #[allow(clippy::future_not_send)]
    pub async fn capture_utterance<F>(&mut self, stop: F) -> Result<String>
    where
        F: Future<Output = ()>,
    {
        self.state = VoiceState::Idle;
        self.start_listening()?;

        let mut transcript = TranscriptAccumulator::new();
        let deadline = tokio::time::sleep(self.timing.session_timeout);
        tokio::pin!(stop, deadline);

        let reason = {
            let Some(listening) = self.listening.as_mut() else {
                return Err(Error::DeviceUnavailable("listening session vanished".to_string()));
            };

            loop {
                tokio::select! {
                    Some(fragment) = listening.results.recv() => {
                        if transcript.push(&fragment) {
                            tracing::debug!(utterance = transcript.utterance(), "transcript updated");
                        }
                    }
                    () = &mut stop => break StopReason::User,
                    () = &mut deadline => break StopReason::Deadline,
                }
            }
        };

        self.state = VoiceState::Draining;
        let had_partial = !transcript.is_empty();
        tracing::debug!(?reason, had_partial, "stopping voice input");

        let results = self.stop_listening();
        if let Some(mut results) = results {
            let grace = self.timing.grace;
            let drained = tokio::time::timeout(grace, async {
                while let Some(fragment) = results.recv().await {
                    if transcript.push(&fragment) {
                        tracing::debug!(utterance = transcript.utterance(), "late transcript received");
                    }
                }
            })
            .await;

            if drained.is_err() {
                tracing::debug!(grace_ms = grace.as_millis(), "grace window elapsed");
            }
        }

        self.state = VoiceState::Finished;

        if reason == StopReason::Deadline && transcript.is_empty() {
            tracing::info!("voice input timed out without speech");
            return Err(Error::VoiceInputTimeout);
        }

        let utterance = transcript.finish();
        tracing::info!(utterance = %utterance, "voice input captured");
        Ok(utterance)
    }

    /// Open the microphone and start chunked recognition
    ///
    /// A no-op while already listening.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the microphone cannot be opened
    pub fn start_listening(&mut self) -> Result<()> {
        if self.listening.is_some() {
            return Ok(());
        }

        let pending = self.capture.start()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let scheduler = ChunkScheduler::new(
            pending,
            Arc::clone(&self.recognizer),
            self.settings.clone(),
            self.timing.chunk_interval,
            self.timing.request_timeout,
            tx,
        )
        .spawn(cancel.child_token());

        self.listening = Some(Listening {
            cancel,
            results: rx,
            scheduler,
        });
        self.state = VoiceState::Listening;
        Ok(())
    }

    /// Stop the microphone and chunk scheduler
    ///
    /// Safe to call repeatedly. Returns the transcript channel of the session
    /// that was stopped so late results can still be drained; the scheduler
    /// flushes the audio captured since its last tick before exiting.
    pub fn stop_listening(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.capture.stop();

        let listening = self.listening.take()?;
        listening.cancel.cancel();
        // The scheduler exits on its own after flushing; in-flight requests keep running
        drop(listening.scheduler);
        Some(listening.results)
    }
}

impl Drop for VoiceInput {
    fn drop(&mut self) {
        self.stop_listening();
    }
}
