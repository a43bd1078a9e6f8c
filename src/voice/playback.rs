//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rubato::{FftFixedIn, Resampler};

use crate::{Error, Result};

/// Preferred frames per resampler call
const RESAMPLE_CHUNK: usize = 1024;

/// Mono audio ready to play
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Clip {
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.samples.len() as u64 * 1000 / u64::from(self.sample_rate))
    }
}

/// Decode synthesized audio (WAV or MP3) to a mono clip
///
/// # Errors
///
/// Returns error if the bytes are neither valid WAV nor MP3
pub fn decode(audio: &[u8]) -> Result<Clip> {
    if audio.starts_with(b"RIFF") {
        decode_wav(audio)
    } else {
        decode_mp3(audio)
    }
}

/// Decode WAV bytes, downmixing to mono
fn decode_wav(wav_data: &[u8]) -> Result<Clip> {
    let mut reader =
        hound::WavReader::new(Cursor::new(wav_data)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = f32::from(1_u16 << 15);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / scale))
                .collect::<std::result::Result<_, _>>()
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
    }
    .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?;

    Ok(Clip {
        samples: downmix(&interleaved, usize::from(spec.channels)),
        sample_rate: spec.sample_rate,
    })
}

/// Decode MP3 bytes to f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Clip> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0_u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or_default();
                let pcm: Vec<f32> = frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                samples.extend(downmix(&pcm, frame.channels));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Audio("no audio frames decoded".to_string()));
    }

    Ok(Clip {
        samples,
        sample_rate,
    })
}

/// Average interleaved channels into one
#[allow(clippy::cast_precision_loss)]
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resample a clip to `target_rate`
///
/// # Errors
///
/// Returns error if the resampler cannot be built or fails
pub fn resample(clip: Clip, target_rate: u32) -> Result<Vec<f32>> {
    if clip.sample_rate == target_rate || clip.samples.is_empty() {
        return Ok(clip.samples);
    }

    let mut resampler = FftFixedIn::<f32>::new(
        clip.sample_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        2,
        1,
    )
    .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let mut out = Vec::with_capacity(
        clip.samples.len() * target_rate as usize / clip.sample_rate as usize + RESAMPLE_CHUNK,
    );

    let mut pos = 0;
    while pos < clip.samples.len() {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(clip.samples.len());
        let input: [&[f32]; 1] = [&clip.samples[pos..end]];

        let frames = if end - pos == needed {
            resampler.process(&input[..], None)
        } else {
            resampler.process_partial(Some(&input[..]), None)
        }
        .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;

        if let Some(channel) = frames.first() {
            out.extend_from_slice(channel);
        }
        pos = end;
    }

    Ok(out)
}

/// Sets the stop flag when the playback future is dropped
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Plays audio to the default output device
#[derive(Debug, Clone)]
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Output device sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Decode and play synthesized audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub async fn play_bytes(&self, audio: &[u8]) -> Result<()> {
        let clip = decode(audio)?;
        self.play(clip).await
    }

    /// Play a clip, resampling to the device rate when needed
    ///
    /// Dropping the returned future stops the sound.
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub async fn play(&self, clip: Clip) -> Result<()> {
        let samples = resample(clip, self.sample_rate())?;
        if samples.is_empty() {
            return Ok(());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let _guard = StopOnDrop(Arc::clone(&stop));
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || play_blocking(&config, samples, &stop))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Play samples on a dedicated thread until done or stopped
fn play_blocking(config: &StreamConfig, samples: Vec<f32>, stop: &AtomicBool) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = usize::from(config.channels);
    let sample_count = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let samples_cb = Arc::clone(&samples);
    let position_cb = Arc::clone(&position);
    let finished_cb = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = position_cb.load(Ordering::Relaxed);

                for frame in data.chunks_mut(channels) {
                    let sample = samples_cb.get(pos).copied().unwrap_or_else(|| {
                        finished_cb.store(true, Ordering::Relaxed);
                        0.0
                    });

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if pos < samples_cb.len() {
                        pos += 1;
                    }
                }

                position_cb.store(pos, Ordering::Relaxed);
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let duration_ms = (sample_count as u64 * 1000) / u64::from(config.sample_rate.0.max(1));
    let start = Instant::now();
    let timeout = Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::Relaxed) {
        if stop.load(Ordering::Relaxed) {
            tracing::debug!(
                played = position.load(Ordering::Relaxed),
                samples = sample_count,
                "playback interrupted"
            );
            return Ok(());
        }
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Let the device drain its last buffer
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");

    Ok(())
}
