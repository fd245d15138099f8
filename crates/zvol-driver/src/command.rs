use crate::error::{DriverError, Result};
use std::process::Command;
use tracing::debug;

/// Output from a command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Capability to run an external command, optionally with elevated privilege
///
/// Implementations fail with `DriverError::CommandFailed` carrying the
/// command's stderr whenever the command exits non-zero. `ProcessExecutor`
/// runs real processes; `MockExecutor` replays scripted responses in tests.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, program: &str, args: &[&str], run_as_root: bool) -> Result<CommandOutput>;
}

/// Runs commands as child processes, blocking until they exit
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    root_helper: Option<String>,
}

impl ProcessExecutor {
    /// `root_helper` is prepended to privileged invocations (e.g. "sudo").
    pub fn new(root_helper: Option<String>) -> Self {
        Self { root_helper }
    }

    fn command_line(&self, program: &str, args: &[&str], run_as_root: bool) -> Vec<String> {
        let mut line = Vec::with_capacity(args.len() + 2);
        if run_as_root {
            if let Some(helper) = &self.root_helper {
                line.push(helper.clone());
            }
        }
        line.push(program.to_string());
        line.extend(args.iter().map(|a| a.to_string()));
        line
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute(&self, program: &str, args: &[&str], run_as_root: bool) -> Result<CommandOutput> {
        let line = self.command_line(program, args, run_as_root);
        let command_line = line.join(" ");
        debug!("Executing: {}", command_line);

        let (binary, rest) = match line.split_first() {
            Some(split) => split,
            None => return Err(DriverError::command_failed(command_line, -1, "empty command")),
        };

        let output = Command::new(binary)
            .args(rest)
            .output()
            .map_err(|e| DriverError::command_failed(&command_line, -1, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        debug!("Command exited with code {}: {}", exit_code, command_line);

        if exit_code != 0 {
            return Err(DriverError::command_failed(command_line, exit_code, stderr));
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_command_line_prepends_root_helper() {
        let exec = ProcessExecutor::new(Some("sudo".to_string()));
        assert_eq!(
            exec.command_line("zfs", &["list", "tank/vol001"], true),
            vec!["sudo", "zfs", "list", "tank/vol001"]
        );
        assert_eq!(
            exec.command_line("zfs", &["list", "tank/vol001"], false),
            vec!["zfs", "list", "tank/vol001"]
        );
    }

    #[test]
    fn test_command_line_without_helper() {
        let exec = ProcessExecutor::new(None);
        assert_eq!(
            exec.command_line("zfs", &["snapshot", "tank/v@s"], true),
            vec!["zfs", "snapshot", "tank/v@s"]
        );
    }

    #[test]
    fn test_execute_captures_stdout() {
        let exec = ProcessExecutor::new(None);
        let output = exec
            .execute("sh", &["-c", "printf 'tank/vol001\\n'"], false)
            .unwrap();
        assert_eq!(output.stdout, "tank/vol001\n");
        assert_eq!(output.exit_code, 0);
    }

    #[test]
    fn test_execute_nonzero_exit_carries_stderr() {
        let exec = ProcessExecutor::new(None);
        let err = exec
            .execute(
                "sh",
                &["-c", "echo \"cannot open 'tank/x': dataset does not exist\" >&2; exit 1"],
                false,
            )
            .unwrap_err();
        match err {
            DriverError::CommandFailed {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 1);
                assert!(stderr.contains("dataset does not exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_execute_spawn_failure() {
        let exec = ProcessExecutor::new(None);
        let err = exec
            .execute("/nonexistent/zvol-test-binary", &["list"], false)
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::CommandFailed { exit_code: -1, .. }
        ));
    }

    #[test]
    fn test_execute_through_root_helper_script() {
        // The helper is `sh`, which reads the fake zfs script as its first argument.
        let dir = tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let script = dir.path().join("zfs");
        std::fs::write(
            &script,
            format!("echo \"$@\" >> '{}'\necho done\n", log.display()),
        )
        .unwrap();

        let exec = ProcessExecutor::new(Some("sh".to_string()));
        let output = exec
            .execute(
                script.to_str().unwrap(),
                &["destroy", "-d", "tank/vol002@snapity"],
                true,
            )
            .unwrap();

        assert_eq!(output.stdout, "done\n");
        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls, "destroy -d tank/vol002@snapity\n");
    }
}
