//! External process executor boundary.

use crate::error::Error;
use std::process::{Child, Command};
use tracing::{debug, error};

/// Completion information for a dispatched command. The queue only cares
/// about success/failure of dispatch, never the command's own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs one opaque shell command at a time.
///
/// `execute` only dispatches; the completion signal is delivered separately
/// through `wait_for_exit`. Cancellation deregisters interest in the result,
/// it never interrupts a command already handed over: the running move or
/// copy completes on its own.
pub trait CommandExecutor {
    /// Dispatch a command. Errs only when the dispatch itself fails.
    fn execute(&mut self, command: &str) -> Result<(), Error>;

    /// Block until the in-flight command exits. `None` when nothing is in
    /// flight.
    fn wait_for_exit(&mut self) -> Option<ExitInfo>;
}

/// Executor shelling out via `sh -c`, mirroring how moves and copies are
/// expressed as whole command strings with shell globbing for sidecar files.
#[derive(Default)]
pub struct ShellExecutor {
    child: Option<Child>,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&mut self, command: &str) -> Result<(), Error> {
        debug!("dispatching: {}", command);
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .spawn()
            .map_err(|err| Error::Dispatch(format!("failed to spawn '{}': {}", command, err)))?;
        self.child = Some(child);
        Ok(())
    }

    fn wait_for_exit(&mut self) -> Option<ExitInfo> {
        let mut child = self.child.take()?;
        match child.wait() {
            Ok(status) => Some(ExitInfo {
                code: status.code(),
            }),
            Err(err) => {
                error!("Error waiting for command: {}", err);
                Some(ExitInfo { code: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_executor_reports_exit_code() {
        let mut executor = ShellExecutor::new();
        executor.execute("true").unwrap();
        assert_eq!(executor.wait_for_exit(), Some(ExitInfo { code: Some(0) }));
        // nothing in flight anymore
        assert_eq!(executor.wait_for_exit(), None);

        executor.execute("exit 3").unwrap();
        assert_eq!(executor.wait_for_exit(), Some(ExitInfo { code: Some(3) }));
    }
}
