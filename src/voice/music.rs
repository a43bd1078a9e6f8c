//! Looping background music under the game

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::playback::{Clip, decode, resample};
use crate::{Error, Result};

/// Background music settings
#[derive(Debug, Clone, PartialEq)]
pub struct MusicSettings {
    pub path: PathBuf,
    /// Loudness as a power of two: 0 is unchanged, -1 halves the amplitude
    pub volume: f32,
}

/// Amplitude factor for a power-of-two volume
#[must_use]
pub fn gain(volume: f32) -> f32 {
    volume.exp2()
}

/// Endless cursor over a clip, scaled by a fixed gain
#[derive(Debug)]
pub struct MusicLoop {
    samples: Vec<f32>,
    position: usize,
    gain: f32,
}

impl MusicLoop {
    #[must_use]
    pub fn new(samples: Vec<f32>, volume: f32) -> Self {
        Self {
            samples,
            position: 0,
            gain: gain(volume),
        }
    }

    /// Fill interleaved output frames, wrapping to the start of the clip
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let sample = self
                .samples
                .get(self.position)
                .map_or(0.0, |s| s * self.gain);

            for out in frame.iter_mut() {
                *out = sample;
            }

            if !self.samples.is_empty() {
                self.position = (self.position + 1) % self.samples.len();
            }
        }
    }
}

/// Music playing on its own thread until stopped or dropped
#[derive(Debug)]
pub struct BackgroundMusic {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl BackgroundMusic {
    /// Start looping the configured track
    ///
    /// Returns `None`, after logging why, when the file is missing or cannot
    /// be decoded. Output device errors are logged from the music thread.
    #[must_use]
    pub fn start(settings: &MusicSettings) -> Option<Self> {
        let clip = match load(&settings.path) {
            Ok(clip) => clip,
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %settings.path.display(), "no background music file, playing without music");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %settings.path.display(), error = %e, "failed to load background music");
                return None;
            }
        };

        tracing::info!(
            path = %settings.path.display(),
            seconds = clip.duration().as_secs(),
            volume = settings.volume,
            "starting background music"
        );

        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop);
        let volume = settings.volume;

        let thread = std::thread::Builder::new()
            .name("background-music".to_string())
            .spawn(move || {
                if let Err(e) = play_looped(clip, volume, &stop_thread) {
                    tracing::warn!(error = %e, "background music stopped");
                }
            })
            .inspect_err(|e| tracing::warn!(error = %e, "failed to spawn music thread"))
            .ok()?;

        Some(Self {
            stop,
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        !self.stop.load(Ordering::Relaxed)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the music and release the output device; safe to call repeatedly
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("music thread panicked");
            }
            tracing::debug!("background music stopped");
        }
    }
}

impl Drop for BackgroundMusic {
    fn drop(&mut self) {
        self.stop();
    }
}

fn load(path: &Path) -> Result<Clip> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Loop `clip` on the default output device until `stop` is set
fn play_looped(clip: Clip, volume: f32, stop: &AtomicBool) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let config: StreamConfig = device
        .default_output_config()
        .map_err(|e| Error::Audio(e.to_string()))?
        .config();

    let samples = resample(clip, config.sample_rate.0)?;
    if samples.is_empty() {
        return Ok(());
    }

    let channels = usize::from(config.channels);
    let music = Arc::new(Mutex::new(MusicLoop::new(samples, volume)));
    let music_cb = Arc::clone(&music);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if let Ok(mut music) = music_cb.lock() {
                    music.fill(data, channels);
                } else {
                    data.fill(0.0);
                }
            },
            |err| {
                tracing::error!(error = %err, "background music playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    Ok(())
}
