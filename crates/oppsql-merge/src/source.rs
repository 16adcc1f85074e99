use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{MergeError, Result};

/// One result database contributing rows to a merge.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceFile {
    /// Location of the database file.
    pub path: PathBuf,
    /// Logical name: the file name without its final extension.
    pub name: String,
}

impl SourceFile {
    /// Derive the logical name from the file stem.
    ///
    /// `General-#0.sca` and `General-#0.vec` both map to `General-#0`, which
    /// is how the scalar and vector file of one run end up sharing an id.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_stem()
            .ok_or_else(|| MergeError::Config(format!("no file name in {}", path.display())))?
            .to_str()
            .ok_or_else(|| MergeError::NonUtf8Path(path.clone()))?
            .to_string();
        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The distinct logical names of `sources`.
pub fn logical_names(sources: &[SourceFile]) -> BTreeSet<String> {
    sources.iter().map(|s| s.name.clone()).collect()
}
