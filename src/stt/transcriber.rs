use crate::defaults;
use crate::error::{HoldwatchError, Result};
use crate::pipeline::types::{AudioFormat, TranscriptSegment};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for speech-to-text transcription.
///
/// Calls are synchronous and may take seconds. Implementations are shared
/// with the consumer thread, hence `Send + Sync`.
pub trait Transcriber: Send + Sync {
    /// Transcribe one chunk of raw PCM.
    ///
    /// # Arguments
    /// * `audio` - interleaved little-endian 16-bit PCM in the capture format
    ///
    /// # Returns
    /// Segments in the order the engine produced them
    fn transcribe(&self, audio: &[u8]) -> Result<Vec<TranscriptSegment>>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

impl<T: Transcriber> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[u8]) -> Result<Vec<TranscriptSegment>> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Configuration for transcriber initialization
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    pub model_path: PathBuf,
    pub language: String,
    pub beam_size: u32,
    pub threads: Option<usize>,
    /// Layout of the bytes passed to `transcribe`.
    pub input_format: AudioFormat,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(""),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            beam_size: defaults::BEAM_SIZE,
            threads: None,
            input_format: AudioFormat::new(
                defaults::SAMPLE_RATE,
                defaults::CHANNELS,
                defaults::BYTES_PER_SAMPLE,
            ),
        }
    }
}

/// Mock transcriber for testing.
///
/// Returns scripted responses in order, then falls back to the default
/// response. Clones share the script and the call counter.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    script: Arc<Mutex<VecDeque<Option<String>>>>,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: String::new(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            should_fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Response used once the script is exhausted.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Queue one response for the next unscripted call.
    pub fn then_respond(self, response: &str) -> Self {
        self.push_script(Some(response.to_string()));
        self
    }

    /// Queue one failure for the next unscripted call.
    pub fn then_fail(self) -> Self {
        self.push_script(None);
        self
    }

    /// Configure the mock to fail on every call
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Block each call for `delay`, simulating a slow engine.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push_script(&self, entry: Option<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    fn next_response(&self) -> Option<String> {
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(entry) => entry,
            None => Some(self.response.clone()),
        }
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &[u8]) -> Result<Vec<TranscriptSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.should_fail {
            return Err(HoldwatchError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        match self.next_response() {
            Some(text) => Ok(text.split('|').map(TranscriptSegment::new).collect()),
            None => Err(HoldwatchError::Transcription {
                message: "scripted mock failure".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
