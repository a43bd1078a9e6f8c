//! Shared test utilities: fake devices and backends, no hardware or network

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gofigure::llm::{CharacterReply, DialogueGenerator};
use gofigure::voice::{
    Alternative, CaptureDevice, CaptureStream, PendingAudio, RecognitionRequest,
    RecognitionResult, RecognitionSettings, SpeechRecognizer, Speaker,
};
use gofigure::{Error, Message, Result, Scenario};

pub const MANOR: &str = r#"{
    "title": "Death at Blackwood Manor",
    "killer": "Mustard",
    "weapon": "candlestick",
    "location": "dining room",
    "introduction": "A storm rolls over the manor. Lord Blackwood lies dead.",
    "narrator_tts": [{"engine": "google", "model": "en-GB-Chirp3-HD-Charon"}],
    "characters": [
        {
            "name": "Colonel Mustard",
            "personality": "Gruff retired officer",
            "knowledge": ["Was in the library at nine"],
            "reliable": false,
            "tts": [{"engine": "google", "model": "en-GB-Chirp3-HD-Fenrir"}]
        },
        {
            "name": "Miss Scarlet",
            "personality": "Charming and sharp",
            "knowledge": ["Heard a crash from the dining room"],
            "reliable": true,
            "tts": []
        }
    ]
}"#;

/// The standard test scenario
#[must_use]
pub fn manor() -> Scenario {
    Scenario::from_json(MANOR).expect("fixture scenario is valid")
}

/// Recognition settings used by the voice tests
#[must_use]
pub fn settings() -> RecognitionSettings {
    RecognitionSettings {
        sample_rate: 16000,
        language_code: "en-US".to_string(),
        auto_punctuation: true,
        model: "latest_long".to_string(),
    }
}

/// Counters shared between a [`FakeDevice`] and the test
#[derive(Debug, Default)]
pub struct DeviceCounters {
    pub opens: AtomicUsize,
    pub stops: AtomicUsize,
}

impl DeviceCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Capture device that delivers a fixed burst of audio on open
pub struct FakeDevice {
    counters: Arc<DeviceCounters>,
    burst: Vec<i16>,
    fail: bool,
}

impl FakeDevice {
    /// A device that delivers `seconds` of audio as soon as it opens
    pub fn with_audio(seconds: u32) -> (Self, Arc<DeviceCounters>) {
        let counters = Arc::new(DeviceCounters::default());
        let device = Self {
            counters: Arc::clone(&counters),
            burst: vec![1000; 16000 * seconds as usize],
            fail: false,
        };
        (device, counters)
    }

    /// A device that cannot be opened
    pub fn broken() -> Self {
        Self {
            counters: Arc::new(DeviceCounters::default()),
            burst: Vec::new(),
            fail: true,
        }
    }
}

struct FakeStream(Arc<DeviceCounters>);

impl CaptureStream for FakeStream {
    fn stop(self: Box<Self>) {
        self.0.stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl CaptureDevice for FakeDevice {
    fn open(&mut self, _sample_rate: u32, sink: Arc<PendingAudio>) -> Result<Box<dyn CaptureStream>> {
        if self.fail {
            return Err(Error::DeviceUnavailable("no microphone attached".to_string()));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        sink.push(&self.burst);
        Ok(Box::new(FakeStream(Arc::clone(&self.counters))))
    }
}

/// One scripted recognition answer
enum Answer {
    Heard(Vec<String>),
    Fail,
}

/// Recognizer that answers each request from a script after a delay
///
/// Requests beyond the script recognize nothing.
#[derive(Default)]
pub struct FakeRecognizer {
    script: Mutex<VecDeque<(Duration, Answer)>>,
    calls: AtomicUsize,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next request
    #[must_use]
    pub fn then(self, delay: Duration, transcripts: &[&str]) -> Self {
        let heard = transcripts.iter().map(ToString::to_string).collect();
        self.push(delay, Answer::Heard(heard))
    }

    /// Queue a service error for the next request
    #[must_use]
    pub fn failing(self) -> Self {
        self.push(Duration::ZERO, Answer::Fail)
    }

    /// Queue a request that takes an hour to answer
    #[must_use]
    pub fn stalled(self) -> Self {
        self.then(Duration::from_secs(3600), &["far too late"])
    }

    fn push(self, delay: Duration, answer: Answer) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back((delay, answer));
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    fn provider(&self) -> &str {
        "fake"
    }

    async fn recognize(&self, _request: RecognitionRequest) -> Result<Vec<RecognitionResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());

        let Some((delay, answer)) = next else {
            return Ok(Vec::new());
        };
        tokio::time::sleep(delay).await;

        let transcripts = match answer {
            Answer::Heard(transcripts) => transcripts,
            Answer::Fail => {
                return Err(Error::Recognition("503 service unavailable".to_string()));
            }
        };

        Ok(transcripts
            .into_iter()
            .map(|transcript| RecognitionResult {
                alternatives: vec![Alternative {
                    transcript,
                    confidence: 0.9,
                }],
            })
            .collect())
    }
}

/// Speaker that records what it was asked to say
pub struct RecordingSpeaker {
    engine: String,
    delay: Duration,
    fail_on: Option<String>,
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new(engine: &str, delay: Duration) -> Self {
        Self {
            engine: engine.to_string(),
            delay,
            fail_on: None,
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        }
    }

    /// Fail when asked to say exactly `text`
    #[must_use]
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    fn engine(&self) -> &str {
        &self.engine
    }

    async fn speak(&self, text: &str, _emotion: &str, voice: &str) -> Result<()> {
        if let Ok(mut started) = self.started.lock() {
            started.push(format!("{voice}|{text}"));
        }
        if self.fail_on.as_deref() == Some(text) {
            return Err(Error::Synthesis("voice model unavailable".to_string()));
        }

        tokio::time::sleep(self.delay).await;

        if let Ok(mut finished) = self.finished.lock() {
            finished.push(format!("{voice}|{text}"));
        }
        Ok(())
    }
}

/// Dialogue generator with scripted replies
///
/// Records how many messages each call saw. Calls beyond the script fail.
pub struct FakeGenerator {
    available: bool,
    replies: Mutex<VecDeque<Result<CharacterReply>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            available: true,
            replies: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn reply(self, response: &str, emotion: &str) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(CharacterReply {
                response: response.to_string(),
                emotion: emotion.to_string(),
            }));
        }
        self
    }

    #[must_use]
    pub fn fail(self) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(Error::Generation("model overloaded".to_string())));
        }
        self
    }

    /// Conversation snapshots passed to each call
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DialogueGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(Error::Generation("model not pulled".to_string()))
        }
    }

    async fn reply(&self, messages: &[Message]) -> Result<CharacterReply> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(messages.to_vec());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(Error::Generation("no scripted reply".to_string())))
    }
}

/// Cloneable in-memory writer for game output
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
