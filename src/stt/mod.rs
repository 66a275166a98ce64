//! Speech-to-text backends.

pub mod transcriber;
pub mod whisper;

pub use transcriber::{MockTranscriber, Transcriber, TranscriberConfig};
pub use whisper::WhisperTranscriber;
