use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use crate::catalog::TableDescriptor;
use crate::error::Result;
use crate::registry::DbId;

/// Outcome of the deduplication check for one (source, shared table) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DedupDecision {
    /// Every row the source would contribute is already in the target.
    AlreadyRepresented,
    /// At least one row is new; the source's full row set must be copied.
    NeedsInsertion,
}

/// Decides whether a source's rows for a shared table are already merged.
///
/// The check is a set difference over whole rows: the source rows, each
/// tagged with the source's id, minus the rows committed in the target. An
/// empty difference means the table is skipped for this source. A single
/// missing row means all of the source's rows are copied, including the ones
/// that matched. Rows that describe the same run with diverging values are
/// neither detected nor reconciled.
#[derive(Clone, Copy, Debug, Default)]
pub struct DedupPolicy;

impl DedupPolicy {
    pub fn check(
        &self,
        conn: &Connection,
        alias: &str,
        table: &TableDescriptor,
        db_id: DbId,
    ) -> Result<DedupDecision> {
        let missing: bool =
            conn.query_row(&table.missing_rows_sql(alias), params![db_id], |row| row.get(0))?;
        let decision = if missing {
            DedupDecision::NeedsInsertion
        } else {
            DedupDecision::AlreadyRepresented
        };
        debug!(table = %table.name, db_id, ?decision, "dedup check");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The "src" schema is simulated with an in-memory attachment.
    fn setup() -> (Connection, TableDescriptor) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "ATTACH DATABASE ':memory:' AS src;
             CREATE TABLE src.run (runId INTEGER, runName TEXT);
             CREATE TABLE main.run (dbId INTEGER NOT NULL, runId INTEGER, runName TEXT);",
        )
        .unwrap();
        let table = TableDescriptor {
            name: "run".into(),
            columns: vec!["runId".into(), "runName".into()],
            shared: true,
        };
        (conn, table)
    }

    #[test]
    fn empty_source_is_represented() {
        let (conn, table) = setup();
        let d = DedupPolicy.check(&conn, "src", &table, 1).unwrap();
        assert_eq!(d, DedupDecision::AlreadyRepresented);
    }

    #[test]
    fn new_rows_need_insertion() {
        let (conn, table) = setup();
        conn.execute_batch("INSERT INTO src.run VALUES (1, 'r1');").unwrap();
        let d = DedupPolicy.check(&conn, "src", &table, 1).unwrap();
        assert_eq!(d, DedupDecision::NeedsInsertion);
    }

    #[test]
    fn identical_rows_under_same_id_are_represented() {
        let (conn, table) = setup();
        conn.execute_batch(
            "INSERT INTO src.run VALUES (1, 'r1');
             INSERT INTO main.run VALUES (7, 1, 'r1');",
        )
        .unwrap();
        let d = DedupPolicy.check(&conn, "src", &table, 7).unwrap();
        assert_eq!(d, DedupDecision::AlreadyRepresented);
    }

    #[test]
    fn identical_rows_under_other_id_need_insertion() {
        let (conn, table) = setup();
        conn.execute_batch(
            "INSERT INTO src.run VALUES (1, 'r1');
             INSERT INTO main.run VALUES (7, 1, 'r1');",
        )
        .unwrap();
        let d = DedupPolicy.check(&conn, "src", &table, 8).unwrap();
        assert_eq!(d, DedupDecision::NeedsInsertion);
    }

    #[test]
    fn subset_is_represented() {
        let (conn, table) = setup();
        conn.execute_batch(
            "INSERT INTO src.run VALUES (1, 'r1');
             INSERT INTO main.run VALUES (1, 1, 'r1'), (1, 2, 'r2');",
        )
        .unwrap();
        let d = DedupPolicy.check(&conn, "src", &table, 1).unwrap();
        assert_eq!(d, DedupDecision::AlreadyRepresented);
    }

    #[test]
    fn one_differing_row_forces_insertion() {
        let (conn, table) = setup();
        conn.execute_batch(
            "INSERT INTO src.run VALUES (1, 'r1'), (2, 'changed');
             INSERT INTO main.run VALUES (1, 1, 'r1'), (1, 2, 'r2');",
        )
        .unwrap();
        let d = DedupPolicy.check(&conn, "src", &table, 1).unwrap();
        assert_eq!(d, DedupDecision::NeedsInsertion);
    }

    #[test]
    fn nulls_compare_equal() {
        let (conn, table) = setup();
        conn.execute_batch(
            "INSERT INTO src.run VALUES (1, NULL);
             INSERT INTO main.run VALUES (3, 1, NULL);",
        )
        .unwrap();
        let d = DedupPolicy.check(&conn, "src", &table, 3).unwrap();
        assert_eq!(d, DedupDecision::AlreadyRepresented);
    }
}
