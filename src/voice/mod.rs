//! Voice processing module
//!
//! Handles microphone capture, chunked speech recognition, push-to-talk
//! sessions, speech synthesis, interruptible playback and background music.

mod capture;
mod music;
mod narration;
mod playback;
mod scheduler;
mod session;
mod stt;
mod transcript;
mod tts;

pub use capture::{
    CaptureController, CaptureDevice, CaptureStats, CaptureStream, MicrophoneDevice, PendingAudio,
    SAMPLE_RATE, pcm_to_bytes, pcm_to_wav,
};
pub use music::{BackgroundMusic, MusicLoop, MusicSettings, gain};
pub use narration::{
    NarrationOutcome, NarrationPlayer, Segment, SilentSpeaker, Speaker, SynthesizedSpeaker,
};
pub use playback::{AudioPlayback, Clip, decode, resample};
pub use scheduler::{ChunkScheduler, MIN_CHUNK_INTERVAL};
pub use session::{VoiceInput, VoiceState, VoiceTiming};
pub use stt::{
    Alternative, DummyRecognizer, GoogleRecognizer, RecognitionRequest, RecognitionResult,
    RecognitionSettings, SpeechRecognizer, WhisperRecognizer,
};
pub use transcript::{TranscriptAccumulator, normalize_utterance};
pub use tts::{
    GoogleSynthesizer, OpenAiSynthesizer, SYNTHESIS_SAMPLE_RATE, SpeechSynthesizer,
    SynthesisRequest, language_code,
};
