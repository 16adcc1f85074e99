//! Read helpers over merged OMNeT++ result databases.
//!
//! Queries assume the merged layout produced by `oppsql-merge`: every table
//! carries a leading `dbId`, and runs are identified by `(dbId, runId)`.

pub mod error;
pub mod param;
pub mod vector;

use std::path::Path;

use rusqlite::{Connection, OpenFlags};

pub use error::{QueryError, Result};
pub use param::unique_param;
pub use vector::{group_by_attrs, vector_samples, AttrFilter, VectorSample};

/// Open an existing merged database for reading.
pub fn open(path: &Path) -> Result<Connection> {
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}
