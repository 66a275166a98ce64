//! Command-line interface for holdwatch
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Raise the volume when someone picks up while you are on hold
#[derive(Parser, Debug)]
#[command(
    name = "holdwatch",
    version = env!("HOLDWATCH_VERSION"),
    about = "Raise the volume when someone picks up while you are on hold"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: transcripts, -vv: every frame and chunk)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Exact capture device name (e.g., "BlackHole 2ch")
    #[arg(long, value_name = "DEVICE", conflicts_with = "input")]
    pub device: Option<String>,

    /// Replay a 16-bit WAV file instead of capturing live
    #[arg(long, value_name = "WAV")]
    pub input: Option<PathBuf>,

    /// Whisper model file (ggml .bin)
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Seconds of audio per transcription
    #[arg(long, value_name = "SECS", value_parser = parse_positive_secs)]
    pub chunk_seconds: Option<f64>,

    /// Drop buffered audio older than this. Examples: 10s, 1500ms, 1m
    #[arg(long, value_name = "DURATION", value_parser = parse_delay)]
    pub max_delay: Option<Duration>,
}

fn parse_positive_secs(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(format!("'{}' must be greater than 0", s))
    }
}

/// Parse a delay into a `Duration`.
///
/// Bare numbers are seconds; anything else goes through `humantime`
/// (`10s`, `1500ms`, `1m30s`).
fn parse_delay(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        return Duration::try_from_secs_f64(secs)
            .map_err(|_| format!("'{}' is not a valid number of seconds", s));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List audio input devices, marking loopback candidates
    Devices,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}
