//! Composition root: turns a `Config` into a running pipeline.

use crate::audio::recorder::AudioSource;
use crate::audio::wav::WavAudioSource;
use crate::config::Config;
use crate::error::{HoldwatchError, Result};
use crate::pipeline::orchestrator::{Pipeline, PipelineConfig};
use crate::pipeline::stats::StatsSnapshot;
use crate::pipeline::types::AudioFormat;
use crate::stt::transcriber::{Transcriber, TranscriberConfig};
use crate::stt::whisper::WhisperTranscriber;
use crate::volume;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How often a finite source is checked for completion.
const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub device: Option<String>,
    pub model: Option<PathBuf>,
    pub chunk_seconds: Option<f64>,
    pub max_delay: Option<Duration>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(model) = &self.model {
            config.stt.model_path = model.clone();
        }
        if let Some(secs) = self.chunk_seconds {
            config.chunking.chunk_seconds = secs;
        }
        if let Some(delay) = self.max_delay {
            config.chunking.max_delay_seconds = delay.as_secs_f64();
        }
    }
}

fn capture_format(config: &Config) -> AudioFormat {
    AudioFormat::new(
        config.audio.sample_rate,
        config.audio.channels,
        config.audio.bytes_per_sample,
    )
}

/// WAV replay when `input` is given, live capture otherwise.
pub fn build_source(config: &Config, input: Option<&Path>) -> Result<Box<dyn AudioSource>> {
    let format = capture_format(config);
    if let Some(path) = input {
        let source = WavAudioSource::open(path, format)?.with_realtime(true);
        return Ok(Box::new(source));
    }
    open_capture(config, format)
}

#[cfg(feature = "cpal-audio")]
fn open_capture(config: &Config, format: AudioFormat) -> Result<Box<dyn AudioSource>> {
    let source = crate::audio::capture::CpalAudioSource::open(
        config.audio.device.as_deref(),
        &config.audio.device_patterns,
        format,
    )?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "cpal-audio"))]
fn open_capture(_config: &Config, _format: AudioFormat) -> Result<Box<dyn AudioSource>> {
    Err(HoldwatchError::AudioCapture {
        message: "built without live capture (feature cpal-audio); use --input".to_string(),
    })
}

pub fn transcriber_config(config: &Config) -> TranscriberConfig {
    TranscriberConfig {
        model_path: config.stt.model_path.clone(),
        language: config.stt.language.clone(),
        beam_size: config.stt.beam_size,
        threads: config.stt.threads,
        input_format: capture_format(config),
    }
}

/// Loads the Whisper model. A missing model file is fatal.
pub fn build_transcriber(config: &Config) -> Result<Arc<dyn Transcriber>> {
    let transcriber = WhisperTranscriber::new(transcriber_config(config))?;
    log::debug!(
        "Loaded model {} from {} ({})",
        transcriber.model_name(),
        config.stt.model_path.display(),
        crate::defaults::gpu_backend()
    );
    Ok(Arc::new(transcriber))
}

/// Runs until Ctrl+C, or until a finite source (WAV replay) is exhausted.
///
/// # Errors
/// Anything that fails during startup: invalid config, missing model, no
/// capture device, unreadable WAV. Nothing after startup is returned as an
/// error.
pub async fn run(config: Config, input: Option<PathBuf>) -> Result<StatsSnapshot> {
    config.validate()?;

    let transcriber = build_transcriber(&config)?;
    let actuator = volume::from_config(&config)?;
    let source = build_source(&config, input.as_deref())?;
    let finite = source.is_finite();

    let pipeline_config = PipelineConfig::from_config(&config);
    log::info!(
        "Chunk {} bytes, max delay {:.1}s, gain {}/{} via {}",
        pipeline_config.chunk_bytes(),
        pipeline_config.max_delay.as_secs_f64(),
        pipeline_config.levels.low,
        pipeline_config.levels.high,
        actuator.name()
    );

    let handle = Pipeline::new(pipeline_config).start(source, transcriber, actuator)?;

    let mut ticker = tokio::time::interval(FINISH_POLL_INTERVAL);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| {
                    HoldwatchError::Other(format!("Failed to wait for Ctrl+C: {}", e))
                })?;
                log::info!("Interrupted, shutting down");
                break;
            }
            _ = ticker.tick() => {
                if finite && !handle.is_running() {
                    log::info!("Input exhausted");
                    break;
                }
            }
        }
    }

    // Joining the consumer may wait for an in-flight transcription.
    tokio::task::spawn_blocking(move || handle.stop())
        .await
        .map_err(|e| HoldwatchError::Other(format!("Shutdown task failed: {}", e)))
}
