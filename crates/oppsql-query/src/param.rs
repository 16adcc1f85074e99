use std::str::FromStr;

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::{QueryError, Result};

/// The value of a parameter that is set identically in every run.
///
/// Parameters are matched by suffix, so `sendInterval` finds
/// `**.app[0].sendInterval`. Returns `None` if no run sets it and
/// [`QueryError::AmbiguousParam`] if runs disagree. The stored text is parsed
/// into `T`, so `unique_param::<f64>` reads a numeric parameter.
pub fn unique_param<T: FromStr>(conn: &Connection, name: &str) -> Result<Option<T>> {
    let pattern = format!("%{}", escape_like(name));
    let mut stmt = conn.prepare(
        "SELECT DISTINCT \"parValue\" FROM \"runparam\" \
         WHERE \"parName\" LIKE ?1 ESCAPE '\\' ORDER BY \"parValue\"",
    )?;
    let mut values = stmt
        .query_map(params![pattern], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(name, matches = values.len(), "parameter lookup");

    if values.len() > 1 {
        return Err(QueryError::AmbiguousParam {
            name: name.to_string(),
            values,
        });
    }
    let Some(value) = values.pop() else {
        return Ok(None);
    };
    value
        .parse()
        .map(Some)
        .map_err(|_| QueryError::InvalidParamValue {
            name: name.to_string(),
            value,
            ty: std::any::type_name::<T>(),
        })
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
