//! Terraform CLI driver.
//!
//! Each run materialises a throwaway working directory holding the template,
//! the prior state, and the provider credentials, then shells out to
//! `terraform` with `-chdir` pointing at it. The state file left behind by
//! Terraform is read back and returned as the new blob.

use std::ffi::OsString;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

use super::{ApplyInput, InfraApplier, InfraOutputter};
use crate::command::{CommandError, CommandRunner, ProcessCommandRunner, run_checked};

/// Default Terraform binary name.
pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";

const TEMPLATE_FILE: &str = "main.tf";
const STATE_FILE: &str = "terraform.tfstate";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Errors raised while driving Terraform.
#[derive(Debug, Error)]
pub enum TerraformError {
    /// Raised when the working directory cannot be prepared or read.
    #[error("failed to prepare terraform workspace {path}: {message}")]
    Workspace {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a Terraform invocation fails.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// Raised when Terraform finishes without leaving a state file.
    #[error("terraform {action} did not write a state file")]
    MissingState {
        /// Sub-command that ran.
        action: &'static str,
    },
    /// Raised when an output value cannot be decoded.
    #[error("failed to read terraform output {name}: {message}")]
    Output {
        /// Output name.
        name: String,
        /// Decoder error message.
        message: String,
    },
}

/// Applies templates and reads outputs through the `terraform` CLI.
#[derive(Clone, Debug)]
pub struct TerraformExecutor<R: CommandRunner> {
    terraform_bin: String,
    runner: R,
}

impl TerraformExecutor<ProcessCommandRunner> {
    /// Creates an executor wired to the real process runner.
    #[must_use]
    pub fn with_process_runner(terraform_bin: impl Into<String>) -> Self {
        Self::new(terraform_bin, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> TerraformExecutor<R> {
    /// Creates an executor using the provided runner.
    #[must_use]
    pub fn new(terraform_bin: impl Into<String>, runner: R) -> Self {
        Self {
            terraform_bin: terraform_bin.into(),
            runner,
        }
    }

    fn converge(
        &self,
        action: &'static str,
        input: &ApplyInput<'_>,
    ) -> Result<String, TerraformError> {
        let workspace = Workspace::create()?;
        workspace.write(TEMPLATE_FILE, input.template)?;
        workspace.write(CREDENTIALS_FILE, input.credentials)?;
        if !input.prior_state.is_empty() {
            workspace.write(STATE_FILE, input.prior_state)?;
        }

        info!(action, env_id = input.env_id, "running terraform");
        self.terraform(&workspace, &["init", "-input=false", "-no-color"])?;

        let credentials = workspace.path().join(CREDENTIALS_FILE);
        let mut args = vec![
            String::from(action),
            String::from("-auto-approve"),
            String::from("-input=false"),
            String::from("-no-color"),
            format!("-state={STATE_FILE}"),
        ];
        for (name, value) in [
            ("project_id", input.project_id),
            ("region", input.region),
            ("zone", input.zone),
            ("env_id", input.env_id),
            ("credentials", credentials.as_str()),
        ] {
            args.push(String::from("-var"));
            args.push(format!("{name}={value}"));
        }
        self.terraform(&workspace, args.as_slice())?;

        workspace
            .read(STATE_FILE)?
            .ok_or(TerraformError::MissingState { action })
    }

    fn terraform<S: AsRef<str>>(
        &self,
        workspace: &Workspace,
        args: &[S],
    ) -> Result<String, TerraformError> {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(OsString::from(format!("-chdir={}", workspace.path())));
        full_args.extend(args.iter().map(|arg| OsString::from(arg.as_ref())));
        debug!(
            subcommand = args.first().map(|arg| arg.as_ref()),
            "invoking terraform"
        );
        Ok(run_checked(&self.runner, &self.terraform_bin, &full_args)?)
    }
}

impl<R: CommandRunner> InfraApplier for TerraformExecutor<R> {
    type Error = TerraformError;

    fn apply(&self, input: &ApplyInput<'_>) -> Result<String, Self::Error> {
        self.converge("apply", input)
    }

    fn destroy(&self, input: &ApplyInput<'_>) -> Result<String, Self::Error> {
        self.converge("destroy", input)
    }
}

impl<R: CommandRunner> InfraOutputter for TerraformExecutor<R> {
    type Error = TerraformError;

    fn get(&self, tf_state: &str, name: &str) -> Result<String, Self::Error> {
        let workspace = Workspace::create()?;
        workspace.write(STATE_FILE, tf_state)?;
        let state_arg = format!("-state={STATE_FILE}");
        let stdout = self.terraform(
            &workspace,
            &["output", "-no-color", state_arg.as_str(), "-json", name],
        )?;
        decode_output(name, &stdout)
    }
}

fn decode_output(name: &str, stdout: &str) -> Result<String, TerraformError> {
    let value: serde_json::Value =
        serde_json::from_str(stdout.trim()).map_err(|err| TerraformError::Output {
            name: name.to_owned(),
            message: err.to_string(),
        })?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    })
}

/// Temporary Terraform working directory.
struct Workspace {
    dir: Dir,
    path: Utf8PathBuf,
    _tmp: TempDir,
}

impl Workspace {
    fn create() -> Result<Self, TerraformError> {
        let tmp = tempfile::Builder::new()
            .prefix("bbl-terraform")
            .tempdir()
            .map_err(|err| TerraformError::Workspace {
                path: Utf8PathBuf::from(std::env::temp_dir().to_string_lossy().into_owned()),
                message: err.to_string(),
            })?;
        let path = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).map_err(|raw| {
            TerraformError::Workspace {
                path: Utf8PathBuf::from(raw.to_string_lossy().into_owned()),
                message: String::from("path is not valid UTF-8"),
            }
        })?;
        let dir = Dir::open_ambient_dir(&path, ambient_authority())
            .map_err(|err| workspace_error(&path, &err))?;
        Ok(Self {
            dir,
            path,
            _tmp: tmp,
        })
    }

    fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn write(&self, file: &str, contents: &str) -> Result<(), TerraformError> {
        self.dir
            .write(file, contents)
            .map_err(|err| workspace_error(&self.path.join(file), &err))
    }

    fn read(&self, file: &str) -> Result<Option<String>, TerraformError> {
        match self.dir.read_to_string(file) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(workspace_error(&self.path.join(file), &err)),
        }
    }
}

fn workspace_error(path: &Utf8Path, err: &io::Error) -> TerraformError {
    TerraformError::Workspace {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
