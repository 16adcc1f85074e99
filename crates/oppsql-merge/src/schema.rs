//! Schema unification.
//!
//! The target schema is the union of every source's tables. A table is
//! created from the first source that defines it, as its column list with a
//! synthesized `dbId INTEGER NOT NULL` in front. Later sources defining the
//! same table are assumed to be compatible; they are not compared.
//!
//! Primary keys and foreign keys of the source are not carried over. Shared
//! run-metadata rows may legitimately repeat under one `dbId`, and the merge
//! has to be able to insert them.

use std::collections::BTreeSet;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::attach::Attachment;
use crate::error::{MergeError, Result};
use crate::registry::ID_COLUMN;
use crate::source::SourceFile;
use crate::sql::quote_ident;

/// A column as declared in a source table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub default: Option<String>,
}

impl ColumnDef {
    fn to_sql(&self) -> String {
        let mut sql = quote_ident(&self.name);
        if !self.decl_type.is_empty() {
            sql.push(' ');
            sql.push_str(&self.decl_type);
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        // table_info reports expression defaults without their parentheses.
        if let Some(default) = &self.default {
            sql.push_str(&format!(" DEFAULT ({default})"));
        }
        sql
    }
}

/// Read the declared columns of `table` in `schema`, in declaration order.
pub fn table_columns(conn: &Connection, schema: &str, table: &str) -> Result<Vec<ColumnDef>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value FROM pragma_table_info(?1, ?2) ORDER BY cid",
    )?;
    let columns = stmt
        .query_map(params![table, schema], |row| {
            Ok(ColumnDef {
                name: row.get(0)?,
                decl_type: row.get(1)?,
                not_null: row.get::<_, i64>(2)? != 0,
                default: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Names of all tables in the target (`main`) schema.
pub fn target_tables(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM main.sqlite_master WHERE type = 'table'")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<String>>>()?;
    Ok(names)
}

/// `CREATE TABLE` statement for the merged counterpart of a source table.
pub fn merged_table_sql(table: &str, columns: &[ColumnDef]) -> Result<String> {
    if columns.iter().any(|c| c.name.eq_ignore_ascii_case(ID_COLUMN)) {
        return Err(MergeError::IdColumnClash {
            table: table.to_string(),
        });
    }
    let mut defs = vec![format!("{} INTEGER NOT NULL", quote_ident(ID_COLUMN))];
    defs.extend(columns.iter().map(ColumnDef::to_sql));
    Ok(format!(
        "CREATE TABLE main.{} ({})",
        quote_ident(table),
        defs.join(", ")
    ))
}

/// Extend the target schema with every table the sources define.
///
/// Returns the names of the tables created, in creation order. Each source
/// is attached in turn and its new tables are created in one transaction.
pub fn unify(
    conn: &Connection,
    sources: &[SourceFile],
    registry_table: &str,
    alias: &str,
) -> Result<Vec<String>> {
    let mut known = target_tables(conn)?;
    let mut created = Vec::new();

    for source in sources {
        let attachment = Attachment::attach(conn, source.path(), alias)?;
        let tx = conn.unchecked_transaction()?;
        for table in attachment.tables()? {
            if table.eq_ignore_ascii_case(registry_table) {
                return Err(MergeError::ReservedTable { table });
            }
            if known.contains(&table) {
                continue;
            }
            let columns = table_columns(&tx, attachment.alias(), &table)?;
            tx.execute_batch(&merged_table_sql(&table, &columns)?)?;
            debug!(table = %table, source = %source.name, columns = columns.len(), "created table");
            known.insert(table.clone());
            created.push(table);
        }
        tx.commit()?;
    }

    info!(tables = created.len(), "unified target schema");
    Ok(created)
}
