//! Logger installation for the binary.
//!
//! The library only emits through the `log` facade. `init` wires it to
//! `env_logger`: dependencies log at `warn`, holdwatch at a level picked from
//! the verbosity flags. `RUST_LOG` overrides both when set.

use env_logger::Builder;
use log::LevelFilter;

/// Level for holdwatch's own modules.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn builder(verbose: u8, quiet: bool, rust_log: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("holdwatch", level_for(verbose, quiet))
        .format_timestamp_millis();

    if let Some(filters) = rust_log.filter(|s| !s.trim().is_empty()) {
        builder.parse_filters(filters);
    }
    builder
}

/// Installs the global logger. Later calls are ignored.
pub fn init(verbose: u8, quiet: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    if builder(verbose, quiet, rust_log.as_deref()).try_init().is_err() {
        log::debug!("Logger already installed");
    }
}
