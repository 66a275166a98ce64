//! System command execution behind a trait, so actuators can be tested
//! without spawning processes.

use crate::error::{HoldwatchError, Result};
use std::process::Command;

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use on the consumer thread.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HoldwatchError::ActuatorToolNotFound {
                    tool: command.to_string(),
                }
            } else {
                HoldwatchError::ActuatorFailed {
                    message: format!("Failed to execute {}: {}", command, e),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HoldwatchError::ActuatorFailed {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::CommandExecutor;
    use crate::error::Result;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Records every call and replays configured responses.
    ///
    /// Clones share their call log, so a test can keep one while the
    /// actuator owns another.
    #[derive(Debug, Clone, Default)]
    pub struct MockCommandExecutor {
        calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
        responses: Arc<Mutex<VecDeque<Result<String>>>>,
    }

    impl MockCommandExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, response: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(response.to_string()));
            self
        }

        pub fn with_error(self, error: crate::error::HoldwatchError) -> Self {
            self.responses.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CommandExecutor for MockCommandExecutor {
        fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
            self.calls.lock().unwrap().push((
                command.to_string(),
                args.iter().map(|s| s.to_string()).collect(),
            ));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockCommandExecutor;
    use super::*;

    #[test]
    fn test_command_executor_is_object_safe() {
        let executor: Box<dyn CommandExecutor> = Box::new(MockCommandExecutor::new());
        assert!(executor.execute("echo", &["test"]).is_ok());
    }

    #[test]
    fn test_mock_executor_records_calls_and_replays_responses() {
        let mock = MockCommandExecutor::new()
            .with_response("first")
            .with_error(HoldwatchError::ActuatorFailed {
                message: "boom".to_string(),
            });

        assert_eq!(mock.execute("a", &["1"]).unwrap(), "first");
        assert!(mock.execute("b", &[]).is_err());
        assert_eq!(mock.execute("c", &[]).unwrap(), "");

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], ("a".to_string(), vec!["1".to_string()]));
    }

    #[test]
    fn test_system_executor_missing_tool() {
        let executor = SystemCommandExecutor::new();
        match executor.execute("holdwatch-definitely-not-a-real-tool", &[]) {
            Err(HoldwatchError::ActuatorToolNotFound { tool }) => {
                assert_eq!(tool, "holdwatch-definitely-not-a-real-tool");
            }
            other => panic!("Expected ActuatorToolNotFound, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_system_executor_nonzero_exit() {
        let executor = SystemCommandExecutor::new();
        let result = executor.execute("sh", &["-c", "exit 3"]);
        assert!(matches!(result, Err(HoldwatchError::ActuatorFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_executor_captures_stdout() {
        let executor = SystemCommandExecutor::new();
        assert_eq!(executor.execute("echo", &["70"]).unwrap().trim(), "70");
    }
}
