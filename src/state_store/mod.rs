//! Durable storage of the environment state file.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::debug;

use crate::state::EnvironmentState;

/// File name of the persisted environment state.
pub const STATE_FILE_NAME: &str = "bbl-state.json";

// Staged next to the state file so the rename stays within one directory.
const STAGING_FILE_NAME: &str = ".bbl-state.json.tmp";

/// Errors raised while reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the existing state file is not valid JSON.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the state cannot be rendered.
    #[error("failed to serialise state: {0}")]
    Serialise(String),
}

/// Durable sink for [`EnvironmentState`] checkpoints.
pub trait StateStore {
    /// Error type returned by the store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persists the full environment state.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the state cannot be written.
    fn set(&self, state: &EnvironmentState) -> Result<(), Self::Error>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    type Error = S::Error;

    fn set(&self, state: &EnvironmentState) -> Result<(), Self::Error> {
        (**self).set(state)
    }
}

/// Stores `bbl-state.json` inside a state directory.
#[derive(Clone, Debug)]
pub struct FileStateStore {
    dir: Utf8PathBuf,
}

impl FileStateStore {
    /// Creates a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the state file.
    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    /// Loads the stored state, returning `None` when no state file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] when the file cannot be read or parsed.
    pub fn get(&self) -> Result<Option<EnvironmentState>, StateStoreError> {
        let path = self.path();
        let Some(contents) = read_state(&self.dir, &path)? else {
            return Ok(None);
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| StateStoreError::Parse {
                path,
                message: err.to_string(),
            })
    }
}

impl StateStore for FileStateStore {
    type Error = StateStoreError;

    fn set(&self, state: &EnvironmentState) -> Result<(), Self::Error> {
        let rendered = serde_json::to_string_pretty(state)
            .map_err(|err| StateStoreError::Serialise(err.to_string()))?;
        let path = self.path();
        debug!(%path, "writing environment state");
        write_state(&self.dir, &path, &rendered)
    }
}

fn read_state(dir: &Utf8Path, path: &Utf8Path) -> Result<Option<String>, StateStoreError> {
    let root = match Dir::open_ambient_dir(dir, ambient_authority()) {
        Ok(root) => root,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(StateStoreError::Io {
                path: dir.to_path_buf(),
                message: err.to_string(),
            });
        }
    };

    match root.read_to_string(STATE_FILE_NAME) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StateStoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

fn write_state(dir: &Utf8Path, path: &Utf8Path, rendered: &str) -> Result<(), StateStoreError> {
    Dir::create_ambient_dir_all(dir, ambient_authority()).map_err(|err| StateStoreError::Io {
        path: dir.to_path_buf(),
        message: err.to_string(),
    })?;
    let root = Dir::open_ambient_dir(dir, ambient_authority()).map_err(|err| {
        StateStoreError::Io {
            path: dir.to_path_buf(),
            message: err.to_string(),
        }
    })?;

    let staging = dir.join(STAGING_FILE_NAME);
    let staging_err = |err: io::Error| StateStoreError::Io {
        path: staging.clone(),
        message: err.to_string(),
    };
    let mut file = root.create(STAGING_FILE_NAME).map_err(staging_err)?;
    file.write_all(rendered.as_bytes()).map_err(staging_err)?;
    file.sync_all().map_err(staging_err)?;
    drop(file);

    root.rename(STAGING_FILE_NAME, &root, STATE_FILE_NAME)
        .map_err(|err| StateStoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}
