use std::io;
use std::path::PathBuf;

/// Errors produced while preparing or running a merge.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The target database already exists and overwriting was not requested.
    #[error("target already exists: {} (use overwrite to replace it)", .0.display())]
    TargetExists(PathBuf),

    /// The target path exists but is not a regular file.
    #[error("target is not a file: {}", .0.display())]
    TargetNotFile(PathBuf),

    /// The directory the target should be created in does not exist.
    #[error("target directory does not exist: {}", .0.display())]
    TargetParentMissing(PathBuf),

    /// A source file could not be found on disk.
    #[error("source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// A path cannot be handed to SQLite or turned into a logical name.
    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    /// Invalid merge configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An identifier failed validation before being interpolated into SQL.
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The registry already holds a name this merge wants to insert.
    #[error("registry already contains source {name:?}; merge into a fresh target")]
    RegistryConflict { name: String },

    /// A source was merged without being registered first.
    #[error("source {name:?} is not registered")]
    UnregisteredSource { name: String },

    /// A source defines a table that collides with the registry table.
    #[error("source table {table:?} collides with the registry table")]
    ReservedTable { table: String },

    /// A source table already has a column named like the synthesized id.
    #[error("source table {table:?} already has a dbId column")]
    IdColumnClash { table: String },

    /// A target table lacks the synthesized `dbId` leading column.
    #[error("table {table:?} does not start with the dbId column")]
    MissingIdColumn { table: String },

    /// A source table lacks a column the unified target table has.
    #[error("table {table:?} in {} has no column {column:?}", path.display())]
    IncompatibleTable {
        table: String,
        column: String,
        path: PathBuf,
    },

    /// Attaching a source database to the target connection failed.
    #[error("failed to attach {}: {source}", path.display())]
    Attach {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Copying one table of a source failed; the source is rolled back.
    #[error("failed to copy table {table:?} from {}: {source}", path.display())]
    Copy {
        table: String,
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A table or column required by post-processing is missing.
    #[error("post-processing needs column {column:?} of table {table:?}")]
    PostProcess { table: String, column: String },

    /// Any other SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Malformed configuration file.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error while preparing the target.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the merge crate.
pub type Result<T> = std::result::Result<T, MergeError>;
