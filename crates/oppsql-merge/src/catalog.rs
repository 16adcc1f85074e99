use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::config::MergeConfig;
use crate::error::{MergeError, Result};
use crate::registry::ID_COLUMN;
use crate::schema::{table_columns, target_tables};
use crate::sql::{quote_ident, quote_list};

/// A mergeable table of the unified target schema.
///
/// All statements that copy or compare rows of a table are built from its
/// descriptor, so the only identifiers that reach SQL are names read back
/// from the target schema itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Table name, identical in source and target.
    pub name: String,
    /// Source columns in declaration order, without the synthesized id.
    pub columns: Vec<String>,
    /// Whether the table holds shared run metadata.
    pub shared: bool,
}

impl TableDescriptor {
    /// `?1, "c1", "c2", ...`: a source row tagged with the bound id.
    fn tagged_source_list(&self) -> String {
        let mut items = vec!["?1".to_string()];
        items.extend(self.columns.iter().map(|c| quote_ident(c)));
        items.join(", ")
    }

    /// `"dbId", "c1", "c2", ...`: a full target row.
    fn target_list(&self) -> String {
        let mut items = vec![ID_COLUMN.to_string()];
        items.extend(self.columns.iter().cloned());
        quote_list(&items)
    }

    /// Copy every row of the attached table, tagging it with `?1`.
    pub fn insert_sql(&self, alias: &str) -> String {
        format!(
            "INSERT INTO main.{table} ({target}) SELECT {source} FROM {alias}.{table}",
            table = quote_ident(&self.name),
            target = self.target_list(),
            source = self.tagged_source_list(),
            alias = quote_ident(alias),
        )
    }

    /// Whether some tagged row of the attached table is missing from the
    /// target. Rows are compared whole.
    pub fn missing_rows_sql(&self, alias: &str) -> String {
        format!(
            "SELECT EXISTS (SELECT {source} FROM {alias}.{table} EXCEPT SELECT {target} FROM main.{table})",
            table = quote_ident(&self.name),
            target = self.target_list(),
            source = self.tagged_source_list(),
            alias = quote_ident(alias),
        )
    }
}

/// The set of mergeable tables in the target schema.
///
/// Excludes SQLite's internal tables (`sqlite_sequence` and friends) and the
/// registry table. Loaded once, after schema unification.
#[derive(Clone, Debug, Default)]
pub struct TableCatalog {
    tables: BTreeMap<String, TableDescriptor>,
}

impl TableCatalog {
    pub fn load(conn: &Connection, config: &MergeConfig) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for name in target_tables(conn)? {
            if name.to_ascii_lowercase().starts_with("sqlite_")
                || name.eq_ignore_ascii_case(&config.registry_table)
            {
                continue;
            }
            let mut columns: Vec<String> = table_columns(conn, "main", &name)?
                .into_iter()
                .map(|c| c.name)
                .collect();
            if columns.first().map(String::as_str) != Some(ID_COLUMN) {
                return Err(MergeError::MissingIdColumn { table: name });
            }
            columns.remove(0);
            let shared = config.is_shared(&name);
            tables.insert(
                name.clone(),
                TableDescriptor {
                    name,
                    columns,
                    shared,
                },
            );
        }
        Ok(Self { tables })
    }

    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
