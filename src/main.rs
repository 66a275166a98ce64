use anyhow::Result;
use clap::Parser;
use holdwatch::app::{self, Overrides};
use holdwatch::cli::{Cli, Commands, ConfigAction};
use holdwatch::config::Config;
use holdwatch::logging;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        None => {
            let mut config = load_config(cli.config.as_deref())?;
            Overrides {
                device: cli.device,
                model: cli.model,
                chunk_seconds: cli.chunk_seconds,
                max_delay: cli.max_delay,
            }
            .apply(&mut config);

            let stats = app::run(config, cli.input).await?;
            log::debug!("Final counters: {}", stats);
        }
        Some(Commands::Devices) => {
            let config = load_config(cli.config.as_deref())?;
            list_audio_devices(&config)?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", config.to_toml()?);
            }
            ConfigAction::Path => {
                let path = cli.config.unwrap_or_else(Config::default_path);
                println!("{}", path.display());
            }
        },
    }

    Ok(())
}

/// File (or defaults) → environment overrides.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
    Ok(Config::load_or_default(&path)?.with_env_overrides())
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices(config: &Config) -> Result<()> {
    let devices = holdwatch::audio::capture::list_devices(&config.audio.device_patterns)?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in devices {
        println!("{}", device);
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices(_config: &Config) -> Result<()> {
    anyhow::bail!("built without live capture (feature cpal-audio)")
}
