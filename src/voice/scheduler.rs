//! Periodic hand-off of captured audio to speech recognition

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::capture::{PendingAudio, pcm_to_bytes};
use super::stt::{RecognitionRequest, RecognitionSettings, SpeechRecognizer};

/// Shortest interval between submissions
pub const MIN_CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Takes the pending buffer on a fixed interval and submits it for recognition
///
/// Each submitted chunk is recognized on its own task so a slow request never
/// delays the next tick. Transcripts are sent in the order results arrive.
pub struct ChunkScheduler {
    pending: Arc<PendingAudio>,
    recognizer: Arc<dyn SpeechRecognizer>,
    settings: RecognitionSettings,
    interval: Duration,
    request_timeout: Duration,
    results: mpsc::UnboundedSender<String>,
}

impl ChunkScheduler {
    /// Intervals below [`MIN_CHUNK_INTERVAL`] are raised to it
    #[must_use]
    pub fn new(
        pending: Arc<PendingAudio>,
        recognizer: Arc<dyn SpeechRecognizer>,
        settings: RecognitionSettings,
        interval: Duration,
        request_timeout: Duration,
        results: mpsc::UnboundedSender<String>,
    ) -> Self {
        if interval < MIN_CHUNK_INTERVAL {
            tracing::warn!(
                interval_ms = interval.as_millis(),
                min_ms = MIN_CHUNK_INTERVAL.as_millis(),
                "chunk interval too short, clamping"
            );
        }

        Self {
            pending,
            recognizer,
            settings,
            interval: interval.max(MIN_CHUNK_INTERVAL),
            request_timeout,
            results,
        }
    }

    /// Run until `cancel` fires, then flush whatever audio is left
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        let span = tracing::debug_span!("chunk_scheduler", provider = self.recognizer.provider());
        tokio::spawn(self.run(cancel).instrument(span))
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut chunk = 0_usize;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    chunk += 1;
                    self.submit(chunk);
                }
            }
        }

        chunk += 1;
        self.submit(chunk);
        tracing::debug!(chunks = chunk, "scheduler stopped");
    }

    fn submit(&self, chunk: usize) {
        let samples = self.pending.take();
        if samples.is_empty() {
            tracing::trace!(chunk, "no audio pending");
            return;
        }

        let stats = self.pending.stats();
        tracing::debug!(
            chunk,
            samples = samples.len(),
            bytes_captured = stats.bytes_captured,
            chunks_taken = stats.chunks_taken,
            "submitting audio chunk"
        );

        // Short chunks are still sent; the recognizer just does worse on them
        if samples.len() < self.settings.sample_rate as usize {
            tracing::debug!(chunk, samples = samples.len(), "chunk shorter than one second");
        }

        let request = RecognitionRequest::new(pcm_to_bytes(&samples), &self.settings);
        let recognizer = Arc::clone(&self.recognizer);
        let results = self.results.clone();
        let timeout = self.request_timeout;

        tokio::spawn(
            async move {
                match tokio::time::timeout(timeout, recognizer.recognize(request)).await {
                    Ok(Ok(recognized)) => {
                        if recognized.is_empty() {
                            tracing::debug!(chunk, "no speech recognized in chunk");
                        }
                        for transcript in recognized.into_iter().filter_map(|r| r.best()) {
                            tracing::debug!(
                                chunk,
                                transcript = %transcript.transcript,
                                confidence = transcript.confidence,
                                "chunk transcribed"
                            );
                            // Receiver is gone once the session has finished
                            let _ = results.send(transcript.transcript);
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(chunk, error = %e, "chunk recognition failed");
                    }
                    Err(_) => {
                        tracing::warn!(chunk, timeout_ms = timeout.as_millis(), "chunk recognition timed out");
                    }
                }
            }
            .in_current_span(),
        );
    }
}
