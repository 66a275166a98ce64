//! holdwatch - turn the volume up when someone picks up while you are on hold
//!
//! Captures system audio from a loopback device, transcribes it in fixed-size
//! chunks, and switches the output volume between two levels when trigger
//! phrases are heard.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod stt;
pub mod volume;

// Core traits (source → process → actuate)
pub use audio::recorder::AudioSource;
pub use pipeline::assembler::ChunkSink;
pub use stt::transcriber::Transcriber;
pub use volume::VolumeActuator;

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
pub use pipeline::stats::StatsSnapshot;

// Error handling
pub use error::{HoldwatchError, Result};

// Config
pub use config::{Config, GainBackend};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_matches_build_script() {
        assert_eq!(version_string(), env!("HOLDWATCH_VERSION"));
    }
}
