use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

/// A command that ran but exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{command}` exited with {}: {}", describe_code(.code), .stderr.trim())]
pub struct CommandError {
    pub command: String,
    pub code: Option<i32>,
    pub stderr: String,
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl CommandOutput {
    /// Turn a non-zero exit into a [`CommandError`] naming `command`.
    pub fn check(self, command: impl Into<String>) -> Result<Self, CommandError> {
        if self.success {
            Ok(self)
        } else {
            Err(CommandError {
                command: command.into(),
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

/// Run `program` with `args` in `cwd` and capture its output.
///
/// Only a failure to spawn is an error here; the exit status is reported
/// in the returned [`CommandOutput`].
pub async fn run<I, S>(program: impl AsRef<OsStr>, args: I, cwd: &Path) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd).kill_on_drop(true);

    debug!(command = ?cmd.as_std(), "running");

    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to run {}", program.to_string_lossy()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    Ok(CommandOutput {
        stdout,
        stderr,
        success: output.status.success(),
        code: output.status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_output_becomes_command_error() {
        let output = CommandOutput {
            stdout: String::new(),
            stderr: "fatal: not a git repository\n".into(),
            success: false,
            code: Some(128),
        };

        let err = output.check("git status").unwrap_err();
        assert_eq!(
            err.to_string(),
            "`git status` exited with status 128: fatal: not a git repository"
        );
    }

    #[test]
    fn successful_output_passes_through() {
        let output = CommandOutput {
            stdout: "ok".into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        };
        assert_eq!(output.clone().check("true").unwrap(), output);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_status() {
        let dir = std::env::temp_dir();
        let output = run("sh", ["-c", "echo hello; exit 3"], &dir).await.unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let dir = std::env::temp_dir();
        let result = run("definitely-not-a-real-program-xyz", ["--help"], &dir).await;
        assert!(result.is_err());
    }
}
