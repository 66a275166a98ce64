//! Output-volume actuators.

use crate::defaults::LEVEL_PLACEHOLDER;
use crate::error::{HoldwatchError, Result};
use crate::volume::executor::{CommandExecutor, SystemCommandExecutor};
use std::sync::{Arc, Mutex};

/// Sets the system output level (0-100).
///
/// Owned by the consumer thread, so only `Send` is required.
pub trait VolumeActuator: Send {
    fn set_level(&mut self, level: u8) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Accepts every level and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActuator;

impl VolumeActuator for NoopActuator {
    fn set_level(&mut self, level: u8) -> Result<()> {
        log::trace!("noop actuator: level {}", level);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Runs an external program, substituting `{level}` in its arguments.
#[derive(Debug)]
pub struct CommandActuator<E: CommandExecutor> {
    executor: E,
    template: Vec<String>,
}

impl<E: CommandExecutor> CommandActuator<E> {
    /// `template[0]` is the program, the rest are arguments.
    pub fn new(executor: E, template: Vec<String>) -> Result<Self> {
        if template.is_empty() {
            return Err(HoldwatchError::ConfigInvalidValue {
                key: "gain.command".to_string(),
                message: "command must not be empty".to_string(),
            });
        }
        if !template.iter().any(|part| part.contains(LEVEL_PLACEHOLDER)) {
            return Err(HoldwatchError::ConfigInvalidValue {
                key: "gain.command".to_string(),
                message: format!("command must contain {}", LEVEL_PLACEHOLDER),
            });
        }
        Ok(Self { executor, template })
    }

    /// Program and arguments with the level substituted.
    pub fn render(&self, level: u8) -> Vec<String> {
        let level = level.to_string();
        self.template
            .iter()
            .map(|part| part.replace(LEVEL_PLACEHOLDER, &level))
            .collect()
    }
}

impl CommandActuator<SystemCommandExecutor> {
    pub fn system(template: Vec<String>) -> Result<Self> {
        Self::new(SystemCommandExecutor::new(), template)
    }
}

impl<E: CommandExecutor> VolumeActuator for CommandActuator<E> {
    fn set_level(&mut self, level: u8) -> Result<()> {
        let rendered = self.render(level);
        let Some((program, args)) = rendered.split_first() else {
            return Ok(());
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.executor.execute(program, &args)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Records requested levels in a shared log. Used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    levels: Arc<Mutex<Vec<u8>>>,
    fail: bool,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the level, then report failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every level requested so far, in order.
    pub fn levels(&self) -> Vec<u8> {
        self.levels.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// The level most recently requested, i.e. the observable output state.
    pub fn current(&self) -> Option<u8> {
        self.levels.lock().ok().and_then(|l| l.last().copied())
    }
}

impl VolumeActuator for RecordingActuator {
    fn set_level(&mut self, level: u8) -> Result<()> {
        if let Ok(mut levels) = self.levels.lock() {
            levels.push(level);
        }
        if self.fail {
            return Err(HoldwatchError::ActuatorFailed {
                message: "output device unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;
    use crate::volume::executor::mock::MockCommandExecutor;

    fn template(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_noop_always_succeeds() {
        let mut actuator = NoopActuator;
        assert!(actuator.set_level(30).is_ok());
        assert!(actuator.set_level(70).is_ok());
        assert_eq!(actuator.name(), "none");
    }

    #[test]
    fn test_command_actuator_substitutes_level() {
        let mock = MockCommandExecutor::new();
        let mut actuator = CommandActuator::new(
            mock.clone(),
            defaults::VOLUME_COMMAND.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();

        actuator.set_level(70).unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "osascript");
        assert_eq!(calls[0].1, vec!["-e", "set volume output volume 70"]);
    }

    #[test]
    fn test_command_actuator_placeholder_in_program_name() {
        let actuator =
            CommandActuator::new(MockCommandExecutor::new(), template(&["vol-{level}"])).unwrap();
        assert_eq!(actuator.render(5), vec!["vol-5"]);
    }

    #[test]
    fn test_command_actuator_propagates_failure() {
        let mock = MockCommandExecutor::new().with_error(HoldwatchError::ActuatorToolNotFound {
            tool: "amixer".to_string(),
        });
        let mut actuator =
            CommandActuator::new(mock, template(&["amixer", "set", "Master", "{level}%"])).unwrap();

        assert!(matches!(
            actuator.set_level(30),
            Err(HoldwatchError::ActuatorToolNotFound { .. })
        ));
    }

    #[test]
    fn test_command_actuator_rejects_bad_templates() {
        assert!(CommandActuator::new(MockCommandExecutor::new(), Vec::new()).is_err());
        assert!(CommandActuator::new(MockCommandExecutor::new(), template(&["true"])).is_err());
    }

    #[test]
    fn test_recording_actuator_shares_log() {
        let recorder = RecordingActuator::new();
        let mut boxed: Box<dyn VolumeActuator> = Box::new(recorder.clone());
        boxed.set_level(30).unwrap();
        boxed.set_level(70).unwrap();

        assert_eq!(recorder.levels(), vec![30, 70]);
        assert_eq!(recorder.current(), Some(70));
    }

    #[test]
    fn test_recording_actuator_failing_still_records() {
        let recorder = RecordingActuator::failing();
        let mut actuator = recorder.clone();
        assert!(actuator.set_level(70).is_err());
        assert_eq!(recorder.levels(), vec![70]);
    }
}
