//! Whisper binding for the [`Transcriber`] trait.
//!
//! Chunks arrive in the capture format (typically 44.1 kHz mono i16). They are
//! decoded, down-mixed and resampled to the 16 kHz mono f32 that whisper.cpp
//! expects, then decoded with beam search.
//!
//! # Feature Gate
//!
//! Real inference needs the `whisper` feature (and cmake at build time).
//! Without it a stub is compiled that fails every call.

use crate::audio::convert::{downmix_to_mono, i16_to_f32, le_bytes_to_i16, resample};
use crate::defaults;
use crate::error::{HoldwatchError, Result};
use crate::pipeline::types::TranscriptSegment;
use crate::stt::transcriber::{Transcriber, TranscriberConfig};

#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Converts a capture-format chunk into whisper input samples.
pub fn prepare_audio(bytes: &[u8], config: &TranscriberConfig) -> Vec<f32> {
    let format = config.input_format;
    let samples = le_bytes_to_i16(bytes);
    let mono = downmix_to_mono(&samples, format.channels as usize);
    let resampled = resample(&mono, format.sample_rate, defaults::WHISPER_SAMPLE_RATE);
    resampled.into_iter().map(i16_to_f32).collect()
}

fn model_name_from(config: &TranscriberConfig) -> String {
    config
        .model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Whisper-based transcriber.
///
/// The context is behind a Mutex; a fresh state is created per chunk.
#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: TranscriberConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Stub used when the `whisper` feature is off.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperTranscriber {
    config: TranscriberConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Loads the model.
    ///
    /// # Errors
    /// Returns `HoldwatchError::TranscriptionModelNotFound` if the model file doesn't exist
    /// Returns `HoldwatchError::TranscriptionInferenceFailed` if model loading fails
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(HoldwatchError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from(&config);
        let path = config.model_path.to_str().ok_or_else(|| {
            HoldwatchError::TranscriptionInferenceFailed {
                message: "Invalid UTF-8 in model path".to_string(),
            }
        })?;

        log::info!("Loading whisper model {}", config.model_path.display());
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| HoldwatchError::TranscriptionInferenceFailed {
                message: format!("Failed to load Whisper model: {}", e),
            })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &TranscriberConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Checks the model path only; every transcription fails.
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(HoldwatchError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from(&config);
        Ok(Self { config, model_name })
    }

    pub fn config(&self) -> &TranscriberConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[u8]) -> Result<Vec<TranscriptSegment>> {
        let samples = prepare_audio(audio, &self.config);

        let context =
            self.context
                .lock()
                .map_err(|e| HoldwatchError::TranscriptionInferenceFailed {
                    message: format!("Failed to acquire context lock: {}", e),
                })?;

        let mut state =
            context
                .create_state()
                .map_err(|e| HoldwatchError::TranscriptionInferenceFailed {
                    message: format!("Failed to create Whisper state: {}", e),
                })?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: self.config.beam_size as i32,
            patience: -1.0,
        });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| HoldwatchError::TranscriptionInferenceFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        Ok(state
            .as_iter()
            .map(|segment| TranscriptSegment::new(segment.to_string()))
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, _audio: &[u8]) -> Result<Vec<TranscriptSegment>> {
        Err(HoldwatchError::TranscriptionInferenceFailed {
            message: concat!(
                "Whisper feature not enabled. This binary was built without speech recognition.\n",
                "To fix: cargo build --release (whisper is enabled by default)"
            )
            .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        false
    }
}
