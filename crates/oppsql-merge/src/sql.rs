//! Identifier handling for dynamically built statements.
//!
//! Table and column names come from `sqlite_master` and `pragma_table_info`
//! and are always interpolated through [`quote_ident`]. Names that come from
//! configuration (registry table, attach alias) must additionally pass
//! [`validate_identifier`].

use crate::error::{MergeError, Result};

/// Schema names SQLite reserves for its own databases.
const RESERVED_SCHEMAS: &[&str] = &["main", "temp"];

/// Quote an identifier for SQLite, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote and comma-join a list of identifiers.
pub fn quote_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a configured identifier: ASCII letters, digits and `_`, not
/// starting with a digit, and not prefixed with `sqlite_`.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_start || !valid_rest || name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(MergeError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Validate an alias for `ATTACH DATABASE`.
pub fn validate_schema_alias(alias: &str) -> Result<()> {
    validate_identifier(alias)?;
    if RESERVED_SCHEMAS.iter().any(|r| r.eq_ignore_ascii_case(alias)) {
        return Err(MergeError::InvalidIdentifier(alias.to_string()));
    }
    Ok(())
}
