//! Default configuration constants for holdwatch.
//!
//! Shared by `Config`, `PipelineConfig` and the CLI so every entry point
//! starts from the same tunables.

/// Default capture sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44100;

/// Default number of capture channels.
pub const CHANNELS: u16 = 1;

/// Bytes per sample for 16-bit PCM.
pub const BYTES_PER_SAMPLE: u16 = 2;

/// Duration of audio handed to the transcriber in one call, in seconds.
pub const CHUNK_SECONDS: f64 = 3.0;

/// Upper bound accepted for `chunking.chunk_seconds`.
pub const MAX_CHUNK_SECONDS: f64 = 300.0;

/// Frames older than this (capture to dequeue) purge the accumulator.
pub const MAX_DELAY_SECONDS: f64 = 10.0;

/// Upper bound accepted for `chunking.max_delay_seconds` (one day).
pub const MAX_DELAY_LIMIT_SECONDS: f64 = 86_400.0;

/// How long the consumer waits on an empty queue before polling again.
pub const POLL_TIMEOUT_MS: u64 = 1000;

/// Queue bound for the drop-oldest policy. Zero keeps the queue unbounded.
pub const MAX_QUEUED_FRAMES: usize = 0;

/// Output volume (0..=100) while on hold.
pub const VOLUME_LOW: u8 = 30;

/// Output volume (0..=100) once someone is on the line.
pub const VOLUME_HIGH: u8 = 70;

/// Whisper model file stem.
pub const DEFAULT_MODEL: &str = "ggml-small.en";

/// Transcription language code.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Beam width for Whisper beam search decoding.
pub const BEAM_SIZE: u32 = 10;

/// Sample rate Whisper expects on input.
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Loopback devices that carry system output back as an input.
pub const DEVICE_PATTERNS: &[&str] = &["blackhole", "soundflower"];

/// Phrases that mean a person is on the line. Checked first, in order.
pub const ACTIVATION_PHRASES: &[&str] = &[
    "hello",
    "hi",
    "thank you for waiting",
    "thank you for holding",
    "are you still there",
    "are you there",
    "you hear me",
    "hear you",
];

/// Phrases typical of hold announcements. Checked only if no activation phrase matched.
pub const DEACTIVATION_PHRASES: &[&str] = &[
    "did you know",
    "for more information",
    "if you need",
    "sorry",
    "unfortunately",
    "busy",
    "app",
    "website",
    "the",
];

/// macOS volume command; `{level}` is replaced with the target level.
pub const VOLUME_COMMAND: &[&str] = &["osascript", "-e", "set volume output volume {level}"];

/// Placeholder substituted into the volume command.
pub const LEVEL_PLACEHOLDER: &str = "{level}";

/// Report the GPU backend compiled into this build.
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else if cfg!(feature = "hipblas") {
        "HipBLAS (AMD)"
    } else if cfg!(feature = "openblas") {
        "OpenBLAS"
    } else if cfg!(feature = "metal") {
        "Metal"
    } else {
        "CPU"
    }
}
