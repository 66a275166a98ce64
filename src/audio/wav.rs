//! WAV replay source and chunk dumping.

use crate::audio::convert::le_bytes_to_i16;
use crate::audio::recorder::AudioSource;
use crate::error::{HoldwatchError, Result};
use crate::pipeline::producer::CaptureProducer;
use crate::pipeline::types::{AudioFormat, Chunk};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Sample frames per delivered buffer, close to a typical hardware period.
pub const DEFAULT_FRAME_SAMPLES: usize = 1024;

/// Replays a 16-bit PCM WAV file through the capture producer.
///
/// A feeder thread stands in for the audio callback: it delivers
/// `frame_samples` frames per call, optionally paced at real time, and
/// signals end of stream when the file is exhausted.
pub struct WavAudioSource {
    name: String,
    format: AudioFormat,
    samples: Arc<Vec<i16>>,
    frame_samples: usize,
    realtime: bool,
    stop_flag: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

impl WavAudioSource {
    /// Opens `path` and checks it matches `expected`.
    pub fn open(path: &Path, expected: AudioFormat) -> Result<Self> {
        let file = File::open(path).map_err(|e| HoldwatchError::AudioCapture {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        let mut source = Self::from_reader(Box::new(BufReader::new(file)))?;
        source.name = path.display().to_string();
        source.expect_format(expected)
    }

    /// Parses WAV data from any reader. The format is taken from the header.
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let wav_reader = hound::WavReader::new(reader).map_err(|e| HoldwatchError::AudioCapture {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

        let spec = wav_reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(HoldwatchError::AudioFormatUnsupported {
                expected: "16-bit integer PCM".to_string(),
                actual: format!("{}-bit {:?}", spec.bits_per_sample, spec.sample_format),
            });
        }

        let samples: Vec<i16> = wav_reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HoldwatchError::AudioCapture {
                message: format!("Failed to read WAV samples: {}", e),
            })?;

        Ok(Self {
            name: "wav".to_string(),
            format: AudioFormat::new(spec.sample_rate, spec.channels, 2),
            samples: Arc::new(samples),
            frame_samples: DEFAULT_FRAME_SAMPLES,
            realtime: false,
            stop_flag: Arc::new(AtomicBool::new(false)),
            feeder: None,
        })
    }

    /// Fails with `AudioFormatUnsupported` unless the file matches `expected`.
    pub fn expect_format(self, expected: AudioFormat) -> Result<Self> {
        if self.format != expected {
            return Err(HoldwatchError::AudioFormatUnsupported {
                expected: expected.to_string(),
                actual: self.format.to_string(),
            });
        }
        Ok(self)
    }

    pub fn with_frame_samples(mut self, frame_samples: usize) -> Self {
        self.frame_samples = frame_samples.max(1);
        self
    }

    /// Sleep one buffer period between deliveries.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Interleaved samples as read from the file.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.samples.len() * 2)
    }

    fn buffer_period(&self) -> Duration {
        Duration::from_secs_f64(self.frame_samples as f64 / self.format.sample_rate.max(1) as f64)
    }
}

impl AudioSource for WavAudioSource {
    fn start(&mut self, producer: CaptureProducer) -> Result<()> {
        if self.feeder.is_some() {
            return Ok(());
        }

        let samples = Arc::clone(&self.samples);
        let stop_flag = Arc::clone(&self.stop_flag);
        let step = self.frame_samples * self.format.channels.max(1) as usize;
        let pause = self.realtime.then(|| self.buffer_period());

        let handle = thread::Builder::new()
            .name("holdwatch-wav".to_string())
            .spawn(move || {
                for buffer in samples.chunks(step) {
                    if stop_flag.load(Ordering::Acquire) {
                        break;
                    }
                    if !producer.on_samples(buffer) {
                        break;
                    }
                    if let Some(pause) = pause {
                        thread::sleep(pause);
                    }
                }
                producer.finish();
            })
            .map_err(|e| HoldwatchError::AudioCapture {
                message: format!("Failed to spawn WAV feeder: {}", e),
            })?;

        self.feeder = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.feeder.take()
            && handle.join().is_err()
        {
            return Err(HoldwatchError::AudioCapture {
                message: "WAV feeder thread panicked".to_string(),
            });
        }
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_finite(&self) -> bool {
        true
    }
}

impl Drop for WavAudioSource {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.feeder.take() {
            handle.join().unwrap_or_default();
        }
    }
}

/// Writes `chunk` to `dir` as `chunk_<seq>_<unix-ms>.wav`.
///
/// The directory must exist. Only 16-bit formats are supported.
pub fn save_chunk_wav(dir: &Path, chunk: &Chunk, format: AudioFormat) -> Result<PathBuf> {
    if format.bytes_per_sample != 2 {
        return Err(HoldwatchError::AudioFormatUnsupported {
            expected: "16-bit".to_string(),
            actual: format.to_string(),
        });
    }

    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let path = dir.join(format!("chunk_{}_{}.wav", chunk.sequence, unix_ms));

    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let wav_err = |e: hound::Error| HoldwatchError::AudioCapture {
        message: format!("Failed to write {}: {}", path.display(), e),
    };

    let mut writer = hound::WavWriter::create(&path, spec).map_err(wav_err)?;
    for sample in le_bytes_to_i16(&chunk.bytes) {
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;
    Ok(path)
}

/// Encodes samples as an in-memory 16-bit WAV file.
pub fn encode_wav(samples: &[i16], format: AudioFormat) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let wav_err = |e: hound::Error| HoldwatchError::AudioCapture {
        message: format!("Failed to encode WAV: {}", e),
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_err)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;
    Ok(cursor.into_inner())
}
