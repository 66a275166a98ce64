//! Audio sources and sample helpers.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod convert;
pub mod recorder;
pub mod wav;

pub use recorder::{AudioSource, MockAudioSource};
pub use wav::{WavAudioSource, save_chunk_wav};
