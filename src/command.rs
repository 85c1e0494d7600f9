//! External command execution shared by the CLI-backed collaborators.
//!
//! Terraform and the provider CLIs (`gcloud`, `az`, `aws`) are all driven
//! through [`CommandRunner`], so tests can script their output without
//! spawning processes.

use std::ffi::OsString;
use std::process::Command;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Exit code and captured streams of a finished command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Everything the command wrote to stdout.
    pub stdout: String,
    /// Everything the command wrote to stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with code zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Seam between the collaborators and the processes they drive.
pub trait CommandRunner {
    /// Runs `program` to completion and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError>;
}

/// Runner that spawns real processes with [`std::process::Command`].
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        debug!(program, arg_count = args.len(), "running external command");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| CommandError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Errors surfaced while running external commands.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    /// The program could not be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program name or path.
        program: String,
        /// Error reported by the OS.
        message: String,
    },
    /// Raised when a command completes with a non-zero exit code.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed.
        program: String,
        /// Exit code, if any.
        status: Option<i32>,
        /// Exit code rendered for messages (`unknown` without one).
        status_text: String,
        /// Trimmed stderr.
        stderr: String,
    },
    /// Raised when JSON output from a command cannot be parsed.
    #[error("failed to parse {resource} output: {message}")]
    Parse {
        /// Resource type being parsed (for example `instances`).
        resource: String,
        /// Parser error message.
        message: String,
    },
}

/// Runs `program` and returns stdout when the command exits successfully.
///
/// # Errors
///
/// Returns [`CommandError::CommandFailure`] for a non-zero exit status, or
/// the runner's error when the command cannot be started.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[OsString],
) -> Result<String, CommandError> {
    let output = runner.run(program, args)?;
    if output.is_success() {
        return Ok(output.stdout);
    }

    let status_text = output
        .code
        .map_or_else(|| String::from("unknown"), |code| code.to_string());
    Err(CommandError::CommandFailure {
        program: program.to_owned(),
        status: output.code,
        status_text,
        stderr: output.stderr.trim().to_owned(),
    })
}

/// Runs `program` and deserialises its JSON stdout.
///
/// # Errors
///
/// Returns [`CommandError::Parse`] when stdout is not the expected JSON shape,
/// plus any error from [`run_checked`].
pub fn run_json<R, T>(
    runner: &R,
    program: &str,
    args: &[OsString],
    resource: &str,
) -> Result<T, CommandError>
where
    R: CommandRunner + ?Sized,
    T: DeserializeOwned,
{
    let stdout = run_checked(runner, program, args)?;
    serde_json::from_str::<T>(&stdout).map_err(|err| CommandError::Parse {
        resource: resource.to_owned(),
        message: err.to_string(),
    })
}
