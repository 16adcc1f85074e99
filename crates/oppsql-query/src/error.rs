use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("parameter {name:?} is ambiguous: {values:?}")]
    AmbiguousParam { name: String, values: Vec<String> },

    #[error("parameter {name:?} value {value:?} is not a valid {ty}")]
    InvalidParamValue {
        name: String,
        value: String,
        ty: &'static str,
    },

    #[error("invalid attribute filter {0:?} (expected NAME or NAME=V1,V2)")]
    InvalidFilter(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;
