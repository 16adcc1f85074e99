//! Result-file fixtures shaped like OMNeT++'s SQLite output.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::Connection;

pub const RUN_SCHEMA: &str = "
CREATE TABLE run (
    runId INTEGER PRIMARY KEY AUTOINCREMENT,
    runName TEXT NOT NULL,
    simtimeExp INTEGER NOT NULL
);
CREATE TABLE runattr (
    runId INTEGER NOT NULL REFERENCES run(runId) ON DELETE CASCADE,
    attrName TEXT NOT NULL,
    attrValue TEXT NOT NULL
);
CREATE TABLE runparam (
    runId INTEGER NOT NULL REFERENCES run(runId) ON DELETE CASCADE,
    parName TEXT NOT NULL,
    parValue TEXT NOT NULL
);
";

const SCALAR_SCHEMA: &str = "
CREATE TABLE scalar (
    scalarId INTEGER PRIMARY KEY AUTOINCREMENT,
    runId INTEGER NOT NULL REFERENCES run(runId) ON DELETE CASCADE,
    moduleName TEXT NOT NULL,
    scalarName TEXT NOT NULL,
    scalarValue REAL
);
";

const VECTOR_SCHEMA: &str = "
CREATE TABLE vector (
    vectorId INTEGER PRIMARY KEY AUTOINCREMENT,
    runId INTEGER NOT NULL REFERENCES run(runId) ON DELETE CASCADE,
    moduleName TEXT NOT NULL,
    vectorName TEXT NOT NULL,
    vectorCount INTEGER
);
CREATE TABLE vectordata (
    vectorId INTEGER NOT NULL REFERENCES vector(vectorId) ON DELETE CASCADE,
    eventNumber INTEGER NOT NULL,
    simtimeRaw INTEGER NOT NULL,
    value REAL NOT NULL
);
";

/// Run metadata shared by the scalar and vector file of one run.
pub const RUN_R1: &str = "
INSERT INTO run (runId, runName, simtimeExp) VALUES (1, 'R1', -12);
INSERT INTO runattr VALUES (1, 'configname', '\"General\"');
INSERT INTO runparam VALUES (1, '**.sendInterval', '\"1s\"');
";

fn create(path: &Path, schema: &[&str], rows: &str) -> PathBuf {
    let conn = Connection::open(path).unwrap();
    for ddl in schema {
        conn.execute_batch(ddl).unwrap();
    }
    conn.execute_batch(rows).unwrap();
    path.to_path_buf()
}

/// A scalar file: run metadata plus the `scalar` table.
pub fn scalar_file(dir: &Path, file: &str, rows: &str) -> PathBuf {
    create(&dir.join(file), &[RUN_SCHEMA, SCALAR_SCHEMA], rows)
}

/// A vector file: run metadata plus `vector` and `vectordata`.
pub fn vector_file(dir: &Path, file: &str, rows: &str) -> PathBuf {
    create(&dir.join(file), &[RUN_SCHEMA, VECTOR_SCHEMA], rows)
}

/// A file with arbitrary DDL and rows.
pub fn custom_file(dir: &Path, file: &str, ddl: &str, rows: &str) -> PathBuf {
    create(&dir.join(file), &[ddl], rows)
}

/// Every row of `table`, each rendered as `|`-joined column text, sorted.
pub fn dump(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{table}\"")).unwrap();
    let width = stmt.column_count();
    let mut rows = stmt
        .query_map([], |row| {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(match row.get::<_, Value>(i)? {
                    Value::Null => "NULL".to_string(),
                    Value::Integer(v) => v.to_string(),
                    Value::Real(v) => v.to_string(),
                    Value::Text(v) => v,
                    Value::Blob(v) => format!("{v:?}"),
                });
            }
            Ok(cells.join("|"))
        })
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap();
    rows.sort();
    rows
}
