//! JSON state documents on disk.
//!
//! A state file holds one [`MemoryState`]: the resource identifier plus the
//! desired and persisted attributes. The binary loads it before each
//! lifecycle hook and writes it back afterwards, including after failures,
//! so partial progress survives.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

use crate::state::MemoryState;

/// Errors raised while reading or writing a state file.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// Raised when the state path has no file name.
    #[error("state path {path} is missing a file name")]
    InvalidPath {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// Raised when the state file does not exist.
    #[error("state file {path} does not exist")]
    NotFound {
        /// Missing path.
        path: Utf8PathBuf,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the file content is not a valid state document.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Reads and writes one state file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateStore {
    path: Utf8PathBuf,
}

impl StateStore {
    /// Creates a store for `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Loads the state document.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] when the file is missing, unreadable, or
    /// not valid JSON.
    pub fn load(&self) -> Result<MemoryState, StateStoreError> {
        let (dir, file_name) = self.open_parent()?;
        let contents = dir.read_to_string(file_name).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StateStoreError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                self.io_error(&err)
            }
        })?;
        serde_json::from_str(&contents).map_err(|err| StateStoreError::Parse {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    /// Writes the state document, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] when serialising or writing fails.
    pub fn save(&self, state: &MemoryState) -> Result<(), StateStoreError> {
        let (dir, file_name) = self.open_parent()?;
        let mut rendered =
            serde_json::to_string_pretty(state).map_err(|err| StateStoreError::Parse {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        rendered.push('\n');
        dir.write(file_name, rendered)
            .map_err(|err| self.io_error(&err))
    }

    fn open_parent(&self) -> Result<(Dir, &str), StateStoreError> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| StateStoreError::InvalidPath {
                path: self.path.clone(),
            })?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| {
            StateStoreError::Io {
                path: parent.to_path_buf(),
                message: err.to_string(),
            }
        })?;
        Ok((dir, file_name))
    }

    fn io_error(&self, err: &io::Error) -> StateStoreError {
        StateStoreError::Io {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}
