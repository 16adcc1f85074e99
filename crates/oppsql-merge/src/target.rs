use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{MergeError, Result};

/// The consolidated database a merge writes into.
///
/// A target always starts out as a fresh file: an existing file is either
/// refused or, with `overwrite`, removed before the merge begins.
#[derive(Clone, Debug)]
pub struct Target {
    path: PathBuf,
}

impl Target {
    /// Validate `path` as a merge target.
    pub fn prepare(path: &Path, overwrite: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(MergeError::TargetParentMissing(parent.to_path_buf()));
            }
        }

        if path.exists() {
            if !path.is_file() {
                return Err(MergeError::TargetNotFile(path.to_path_buf()));
            }
            if !overwrite {
                return Err(MergeError::TargetExists(path.to_path_buf()));
            }
            warn!(path = %path.display(), "overwriting existing target");
            fs::remove_file(path)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Create the database file and open a connection to it.
    pub fn open(&self) -> Result<Connection> {
        debug!(path = %self.path.display(), "opening target database");
        Ok(Connection::open(&self.path)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
