//! The registry table: one row per distinct source name.
//!
//! ```text
//! db("dbId" INTEGER PRIMARY KEY AUTOINCREMENT, "dbName" TEXT NOT NULL UNIQUE)
//! ```
//!
//! `dbId` is the value synthesized as the leading column of every merged row,
//! so both are `INTEGER`.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::sql::{quote_ident, validate_identifier};

/// Identifier the registry assigns to a source name.
pub type DbId = i64;

/// Name of the synthesized id column, in the registry and every merged table.
pub const ID_COLUMN: &str = "dbId";

/// Name column of the registry table.
pub const NAME_COLUMN: &str = "dbName";

/// A row of the registry table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub id: DbId,
    pub name: String,
}

/// Access to the registry table of a target database.
#[derive(Clone, Debug)]
pub struct Registry {
    table: String,
}

impl Registry {
    pub fn new(table: &str) -> Result<Self> {
        validate_identifier(table)?;
        Ok(Self {
            table: table.to_string(),
        })
    }

    /// Create the registry table if it does not exist yet.
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY AUTOINCREMENT, {} TEXT NOT NULL UNIQUE);",
            quote_ident(&self.table),
            quote_ident(ID_COLUMN),
            quote_ident(NAME_COLUMN),
        ))?;
        Ok(())
    }

    /// Insert one row per name and return the generated ids.
    ///
    /// All names are inserted in one transaction. A name that is already
    /// registered means the target was not fresh; the whole registration is
    /// rolled back with [`MergeError::RegistryConflict`].
    pub fn register(
        &self,
        conn: &Connection,
        names: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, DbId>> {
        let tx = conn.unchecked_transaction()?;
        let mut ids = BTreeMap::new();
        for name in names {
            if self.find(&tx, name)?.is_some() {
                return Err(MergeError::RegistryConflict { name: name.clone() });
            }
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}) VALUES (?1)",
                    quote_ident(&self.table),
                    quote_ident(NAME_COLUMN)
                ),
                params![name],
            )?;
            let id = tx.last_insert_rowid();
            debug!(name = %name, id, "registered source");
            ids.insert(name.clone(), id);
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Resolve the id of a registered name.
    pub fn lookup(&self, conn: &Connection, name: &str) -> Result<DbId> {
        self.find(conn, name)?
            .ok_or_else(|| MergeError::UnregisteredSource {
                name: name.to_string(),
            })
    }

    /// All registry rows ordered by id.
    pub fn entries(&self, conn: &Connection) -> Result<Vec<RegistryEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {} FROM {} ORDER BY {}",
            quote_ident(ID_COLUMN),
            quote_ident(NAME_COLUMN),
            quote_ident(&self.table),
            quote_ident(ID_COLUMN),
        ))?;
        let entries = stmt
            .query_map([], |row| {
                Ok(RegistryEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn find(&self, conn: &Connection, name: &str) -> Result<Option<DbId>> {
        let id = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?1",
                    quote_ident(ID_COLUMN),
                    quote_ident(&self.table),
                    quote_ident(NAME_COLUMN)
                ),
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}
