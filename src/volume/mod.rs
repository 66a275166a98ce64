//! Volume actuation: the only side effect the pipeline has on the system.

pub mod actuator;
pub mod executor;

pub use actuator::{CommandActuator, NoopActuator, RecordingActuator, VolumeActuator};
pub use executor::{CommandExecutor, SystemCommandExecutor};

use crate::config::{Config, GainBackend};
use crate::error::Result;

/// Builds the actuator selected by `[gain] backend`.
pub fn from_config(config: &Config) -> Result<Box<dyn VolumeActuator>> {
    match config.gain.backend {
        GainBackend::None => Ok(Box::new(NoopActuator)),
        GainBackend::Command => Ok(Box::new(CommandActuator::system(
            config.gain.command.clone(),
        )?)),
    }
}
