use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{MergeError, Result};
use crate::sql::quote_ident;

/// Columns whose values OMNeT++ stores with literal double quotes.
pub const QUOTED_COLUMNS: &[(&str, &str)] = &[("runattr", "attrValue"), ("runparam", "parValue")];

/// Remove every `"` from run attribute and parameter values.
///
/// Applies to all rows currently in the target, in one transaction, and
/// returns the number of rows changed. Running it again changes nothing.
pub fn strip_quotes(conn: &Connection) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut changed = 0;
    for &(table, column) in QUOTED_COLUMNS {
        let present: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM pragma_table_info(?1, 'main') WHERE name = ?2)",
            params![table, column],
            |row| row.get(0),
        )?;
        if !present {
            return Err(MergeError::PostProcess {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        changed += tx.execute(
            &format!(
                "UPDATE main.{table} SET {col} = REPLACE({col}, '\"', '') WHERE instr({col}, '\"') > 0",
                table = quote_ident(table),
                col = quote_ident(column),
            ),
            [],
        )?;
    }
    tx.commit()?;
    info!(rows = changed, "stripped quotes from run metadata");
    Ok(changed)
}
