//! Audio capture from microphone

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Default sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Audio captured but not yet handed to recognition
///
/// The device callback appends under the lock and the chunk scheduler takes
/// the whole buffer under the same lock, so each sample is consumed exactly
/// once and never read while half-written.
#[derive(Debug, Default)]
pub struct PendingAudio {
    samples: Mutex<Vec<i16>>,
    bytes_captured: AtomicU64,
    chunks_taken: AtomicUsize,
}

/// Diagnostic counters for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    pub bytes_captured: u64,
    pub chunks_taken: usize,
    pub pending_bytes: usize,
}

impl PendingAudio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append 16-bit samples from the device
    pub fn push(&self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }
        if let Ok(mut buf) = self.samples.lock() {
            buf.extend_from_slice(samples);
        }
        self.bytes_captured
            .fetch_add((samples.len() * 2) as u64, Ordering::Relaxed);
    }

    /// Take everything pending and leave the buffer empty
    #[must_use]
    pub fn take(&self) -> Vec<i16> {
        let taken = self
            .samples
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        if !taken.is_empty() {
            self.chunks_taken.fetch_add(1, Ordering::Relaxed);
        }
        taken
    }

    #[must_use]
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            bytes_captured: self.bytes_captured.load(Ordering::Relaxed),
            chunks_taken: self.chunks_taken.load(Ordering::Relaxed),
            pending_bytes: self.samples.lock().map(|b| b.len() * 2).unwrap_or_default(),
        }
    }
}

/// A running capture stream; stopping releases the device
pub trait CaptureStream {
    fn stop(self: Box<Self>);
}

/// Something that can open a mono 16-bit capture stream
pub trait CaptureDevice {
    /// Open the device and start delivering samples into `sink`
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the device cannot be opened or started
    fn open(&mut self, sample_rate: u32, sink: Arc<PendingAudio>) -> Result<Box<dyn CaptureStream>>;
}

/// Captures from the default input device via cpal
#[derive(Debug, Default)]
pub struct MicrophoneDevice;

struct CpalStream(cpal::Stream);

impl CaptureStream for CpalStream {
    fn stop(self: Box<Self>) {
        if let Err(e) = self.0.pause() {
            tracing::debug!(error = %e, "failed to pause capture stream");
        }
        drop(self);
    }
}

impl CaptureDevice for MicrophoneDevice {
    fn open(&mut self, sample_rate: u32, sink: Arc<PendingAudio>) -> Result<Box<dyn CaptureStream>> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| {
                Error::DeviceUnavailable("no mono config at the requested rate".to_string())
            })?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "opening capture device"
        );

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let pcm: Vec<i16> = data.iter().map(|&s| to_i16(s)).collect();
                    sink.push(&pcm);
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        Ok(Box::new(CpalStream(stream)))
    }
}

/// Convert an f32 sample in [-1.0, 1.0] to 16-bit PCM
#[allow(clippy::cast_possible_truncation)]
fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Owns the microphone for one push-to-talk session at a time
pub struct CaptureController {
    device: Box<dyn CaptureDevice>,
    sample_rate: u32,
    session: Option<Session>,
}

struct Session {
    stream: Box<dyn CaptureStream>,
    pending: Arc<PendingAudio>,
}

impl CaptureController {
    #[must_use]
    pub fn new(device: Box<dyn CaptureDevice>, sample_rate: u32) -> Self {
        Self {
            device,
            sample_rate,
            session: None,
        }
    }

    /// Start capturing
    ///
    /// Starting while a session is open does not touch the device again and
    /// returns the open session's buffer.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the device cannot be started
    pub fn start(&mut self) -> Result<Arc<PendingAudio>> {
        if let Some(session) = &self.session {
            return Ok(Arc::clone(&session.pending));
        }

        let pending = Arc::new(PendingAudio::new());
        let stream = self.device.open(self.sample_rate, Arc::clone(&pending))?;

        self.session = Some(Session {
            stream,
            pending: Arc::clone(&pending),
        });

        tracing::debug!(sample_rate = self.sample_rate, "audio capture started");
        Ok(pending)
    }

    /// Stop capturing and release the device; a no-op when idle
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.stream.stop();
            let stats = session.pending.stats();
            tracing::debug!(
                bytes_captured = stats.bytes_captured,
                chunks = stats.chunks_taken,
                "audio capture stopped"
            );
        }
    }

    /// Check if a session is open
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Encode 16-bit PCM as little-endian bytes for recognition requests
#[must_use]
pub fn pcm_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Wrap little-endian 16-bit PCM bytes in a WAV container
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for pair in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_swaps_out_pending() {
        let pending = PendingAudio::new();
        pending.push(&[1, 2, 3]);
        pending.push(&[]);
        pending.push(&[4]);

        assert_eq!(pending.take(), vec![1, 2, 3, 4]);
        assert!(pending.take().is_empty());

        let stats = pending.stats();
        assert_eq!(stats.bytes_captured, 8);
        assert_eq!(stats.chunks_taken, 1);
        assert_eq!(stats.pending_bytes, 0);
    }

    #[test]
    fn test_pcm_round_trips_through_wav() {
        let bytes = pcm_to_bytes(&[0, -1, 256]);
        assert_eq!(bytes, vec![0, 0, 0xff, 0xff, 0, 1]);

        let wav = pcm_to_wav(&bytes, 16000).unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, -1, 256]);
    }

    #[test]
    fn test_to_i16_clamps() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(-2.0), -32768);
    }
}
