use crate::error::{HoldwatchError, Result};
use crate::pipeline::producer::CaptureProducer;
use crate::pipeline::types::AudioFormat;
use std::sync::{Arc, Mutex};

/// Trait for audio capture backends.
///
/// `start` registers the producer with the backend, which then calls
/// [`CaptureProducer::on_buffer`] from its own thread. Ownership of that
/// thread stays with the backend.
pub trait AudioSource: Send {
    /// Begin delivering buffers to `producer`.
    ///
    /// # Returns
    /// Ok(()) if capture started, or an error (fatal at startup)
    fn start(&mut self, producer: CaptureProducer) -> Result<()>;

    /// Stop delivering buffers. No callback runs after this returns.
    fn stop(&mut self) -> Result<()>;

    /// Layout of the bytes this source delivers.
    fn format(&self) -> AudioFormat;

    /// Device or file name for logging.
    fn name(&self) -> String;

    /// True for sources that end by themselves (files, fixtures).
    fn is_finite(&self) -> bool {
        false
    }
}

/// Mock audio source for testing.
///
/// Pushes its preset buffers synchronously on `start`. The producer is kept
/// so a test can push more buffers later through [`MockAudioSource::producer`].
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    format: AudioFormat,
    buffers: Vec<Vec<u8>>,
    finish_after_buffers: bool,
    should_fail_start: bool,
    should_fail_stop: bool,
    error_message: String,
    started: Arc<Mutex<bool>>,
    producer: Arc<Mutex<Option<CaptureProducer>>>,
}

impl MockAudioSource {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            buffers: Vec::new(),
            finish_after_buffers: false,
            should_fail_start: false,
            should_fail_stop: false,
            error_message: "mock audio error".to_string(),
            started: Arc::new(Mutex::new(false)),
            producer: Arc::new(Mutex::new(None)),
        }
    }

    /// Raw buffers to deliver on start, in order.
    pub fn with_buffers(mut self, buffers: Vec<Vec<u8>>) -> Self {
        self.buffers = buffers;
        self
    }

    /// `count` buffers of `len` bytes each.
    pub fn with_silence(self, count: usize, len: usize) -> Self {
        self.with_buffers(vec![vec![0u8; len]; count])
    }

    /// Signal end of stream after the preset buffers.
    pub fn with_finish(mut self) -> Self {
        self.finish_after_buffers = true;
        self
    }

    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.started.lock().map(|s| *s).unwrap_or(false)
    }

    /// The producer handed over by `start`, shared by all clones.
    pub fn producer(&self) -> Option<CaptureProducer> {
        self.producer.lock().ok().and_then(|p| p.clone())
    }

    fn set_started(&self, value: bool) {
        if let Ok(mut started) = self.started.lock() {
            *started = value;
        }
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self, producer: CaptureProducer) -> Result<()> {
        if self.should_fail_start {
            return Err(HoldwatchError::AudioDeviceNotFound {
                device: self.error_message.clone(),
            });
        }

        for buffer in &self.buffers {
            producer.on_buffer(buffer);
        }
        if self.finish_after_buffers {
            producer.finish();
        }
        if let Ok(mut slot) = self.producer.lock() {
            *slot = Some(producer);
        }
        self.set_started(true);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            return Err(HoldwatchError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.set_started(false);
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn name(&self) -> String {
        "mock".to_string()
    }

    fn is_finite(&self) -> bool {
        self.finish_after_buffers
    }
}
