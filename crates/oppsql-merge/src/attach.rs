use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use crate::error::{MergeError, Result};
use crate::sql::{quote_ident, validate_schema_alias};

/// A source database attached to the target connection.
///
/// The attachment lives exactly as long as this guard: dropping it runs
/// `DETACH DATABASE`, on the success path and on every error path. Any
/// transaction opened on the connection while attached must be dropped
/// before the guard.
pub struct Attachment<'conn> {
    conn: &'conn Connection,
    alias: String,
    path: PathBuf,
}

impl std::fmt::Debug for Attachment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("alias", &self.alias)
            .field("path", &self.path)
            .finish()
    }
}

impl<'conn> Attachment<'conn> {
    /// Attach the database at `path` under `alias`.
    ///
    /// The file must exist; SQLite would otherwise silently create an empty
    /// database in its place.
    pub fn attach(conn: &'conn Connection, path: &Path, alias: &str) -> Result<Self> {
        validate_schema_alias(alias)?;
        if !path.is_file() {
            return Err(MergeError::SourceMissing(path.to_path_buf()));
        }
        let location = path
            .to_str()
            .ok_or_else(|| MergeError::NonUtf8Path(path.to_path_buf()))?;

        conn.execute(
            &format!("ATTACH DATABASE ?1 AS {}", quote_ident(alias)),
            params![location],
        )
        .map_err(|source| MergeError::Attach {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(alias, path = %path.display(), "attached source");

        Ok(Self {
            conn,
            alias: alias.to_string(),
            path: path.to_path_buf(),
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the user tables defined in the attached database.
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name FROM {}.sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY name",
            quote_ident(&self.alias)
        ))?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Whether the attached database defines `table`.
    pub fn has_table(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT count(*) FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
                quote_ident(&self.alias)
            ),
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl Drop for Attachment<'_> {
    fn drop(&mut self) {
        let sql = format!("DETACH DATABASE {}", quote_ident(&self.alias));
        match self.conn.execute_batch(&sql) {
            Ok(()) => debug!(alias = %self.alias, "detached source"),
            Err(e) => warn!(alias = %self.alias, error = %e, "failed to detach source"),
        }
    }
}
