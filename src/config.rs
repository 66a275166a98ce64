use crate::defaults;
use crate::error::{HoldwatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub chunking: ChunkingConfig,
    pub detection: DetectionConfig,
    pub gain: GainConfig,
    pub stt: SttConfig,
    pub debug: DebugConfig,
}

/// Capture device and PCM layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Exact input device name. Overrides `device_patterns`.
    pub device: Option<String>,
    /// Case-insensitive substrings tried in order when `device` is unset.
    pub device_patterns: Vec<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub bytes_per_sample: u16,
}

/// Chunk sizing and backpressure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_seconds: f64,
    pub max_delay_seconds: f64,
    pub poll_timeout_ms: u64,
    /// Zero keeps the queue unbounded.
    pub max_queued_frames: usize,
}

/// Ordered trigger phrase lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub activation_phrases: Vec<String>,
    pub deactivation_phrases: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GainBackend {
    /// Log only.
    #[default]
    None,
    /// Run `gain.command`.
    Command,
}

/// Output levels and how to apply them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GainConfig {
    pub low: u8,
    pub high: u8,
    pub backend: GainBackend,
    /// Program and arguments; `{level}` is replaced with the target level.
    pub command: Vec<String>,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model_path: PathBuf,
    pub language: String,
    pub beam_size: u32,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DebugConfig {
    /// Write every chunk here as WAV before transcription.
    pub save_chunks_dir: Option<PathBuf>,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            device_patterns: to_strings(defaults::DEVICE_PATTERNS),
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            bytes_per_sample: defaults::BYTES_PER_SAMPLE,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: defaults::CHUNK_SECONDS,
            max_delay_seconds: defaults::MAX_DELAY_SECONDS,
            poll_timeout_ms: defaults::POLL_TIMEOUT_MS,
            max_queued_frames: defaults::MAX_QUEUED_FRAMES,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            activation_phrases: to_strings(defaults::ACTIVATION_PHRASES),
            deactivation_phrases: to_strings(defaults::DEACTIVATION_PHRASES),
        }
    }
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            low: defaults::VOLUME_LOW,
            high: defaults::VOLUME_HIGH,
            backend: GainBackend::None,
            command: to_strings(defaults::VOLUME_COMMAND),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            beam_size: defaults::BEAM_SIZE,
            threads: None,
        }
    }
}

/// `<data_dir>/holdwatch/models/ggml-small.en.bin`
pub fn default_model_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("holdwatch")
        .join("models")
        .join(format!("{}.bin", defaults::DEFAULT_MODEL))
}

fn invalid(key: &str, message: impl Into<String>) -> HoldwatchError {
    HoldwatchError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file doesn't exist.
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - HOLDWATCH_DEVICE → audio.device
    /// - HOLDWATCH_MODEL → stt.model_path
    /// - HOLDWATCH_MAX_DELAY → chunking.max_delay_seconds
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("HOLDWATCH_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(model) = std::env::var("HOLDWATCH_MODEL")
            && !model.is_empty()
        {
            self.stt.model_path = PathBuf::from(model);
        }

        if let Ok(delay) = std::env::var("HOLDWATCH_MAX_DELAY")
            && !delay.is_empty()
        {
            match delay.parse::<f64>() {
                Ok(secs) => self.chunking.max_delay_seconds = secs,
                Err(_) => log::warn!("Ignoring HOLDWATCH_MAX_DELAY={:?}: not a number", delay),
            }
        }

        self
    }

    /// Checks value ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be greater than 0"));
        }
        if audio.channels == 0 {
            return Err(invalid("audio.channels", "must be greater than 0"));
        }
        if !(1..=4).contains(&audio.bytes_per_sample) {
            return Err(invalid("audio.bytes_per_sample", "must be between 1 and 4"));
        }

        let chunking = &self.chunking;
        if !(chunking.chunk_seconds.is_finite() && chunking.chunk_seconds > 0.0) {
            return Err(invalid("chunking.chunk_seconds", "must be positive"));
        }
        if chunking.chunk_seconds > defaults::MAX_CHUNK_SECONDS {
            return Err(invalid(
                "chunking.chunk_seconds",
                format!("must be at most {}", defaults::MAX_CHUNK_SECONDS),
            ));
        }
        if !(chunking.max_delay_seconds.is_finite() && chunking.max_delay_seconds >= 0.0) {
            return Err(invalid("chunking.max_delay_seconds", "must not be negative"));
        }
        if chunking.max_delay_seconds > defaults::MAX_DELAY_LIMIT_SECONDS {
            return Err(invalid(
                "chunking.max_delay_seconds",
                format!("must be at most {}", defaults::MAX_DELAY_LIMIT_SECONDS),
            ));
        }
        if chunking.poll_timeout_ms == 0 {
            return Err(invalid("chunking.poll_timeout_ms", "must be greater than 0"));
        }

        let gain = &self.gain;
        if gain.high > 100 {
            return Err(invalid("gain.high", "must be at most 100"));
        }
        if gain.low >= gain.high {
            return Err(invalid(
                "gain.low",
                format!("must be below gain.high ({})", gain.high),
            ));
        }
        if gain.backend == GainBackend::Command {
            if gain.command.is_empty() {
                return Err(invalid("gain.command", "must not be empty"));
            }
            if !gain
                .command
                .iter()
                .any(|part| part.contains(defaults::LEVEL_PLACEHOLDER))
            {
                return Err(invalid(
                    "gain.command",
                    format!("must contain {}", defaults::LEVEL_PLACEHOLDER),
                ));
            }
        }

        Ok(())
    }

    /// `floor(chunk_seconds × sample_rate × bytes_per_sample × channels)`
    pub fn chunk_bytes(&self) -> usize {
        let bytes_per_second = self.audio.sample_rate as f64
            * self.audio.bytes_per_sample as f64
            * self.audio.channels as f64;
        (self.chunking.chunk_seconds * bytes_per_second).floor() as usize
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/holdwatch/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("holdwatch")
            .join("config.toml")
    }
}
