//! Merge engine for OMNeT++ SQLite result files.
//!
//! Every simulation run writes its results into one or more SQLite files
//! (`.sca` for scalars, `.vec` for vectors). This crate folds a set of such
//! files into a single consolidated database.
//!
//! # Layout of the merged database
//!
//! - a registry table (`db` by default) assigning a generated `dbId` to the
//!   logical name (file stem) of every source file
//! - every table found in any source, with a synthesized leading `dbId`
//!   column tagging each row with the source it came from
//!
//! # Merge Rules
//!
//! 1. The target schema is the union of all source schemas. Columns of a
//!    table come from the first source that defines it.
//! 2. The registry is populated once, before any rows are copied. Sources
//!    sharing a stem share one registry row.
//! 3. Each source file is copied inside one transaction: either all of its
//!    tables land in the target or none do.
//! 4. Shared run-metadata tables (`run`, `runattr`, `runparam`) are skipped
//!    for a source whose tagged rows are already fully present in the target.
//! 5. Sources are merged sequentially over one exclusively owned connection,
//!    with at most one source attached at a time.

pub mod attach;
pub mod catalog;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod postprocess;
pub mod registry;
pub mod schema;
pub mod source;
pub mod sql;
pub mod target;

pub use attach::Attachment;
pub use catalog::{TableCatalog, TableDescriptor};
pub use config::MergeConfig;
pub use dedup::{DedupDecision, DedupPolicy};
pub use engine::{MergeReport, Merger, SourceReport};
pub use error::{MergeError, Result};
pub use postprocess::strip_quotes;
pub use registry::{DbId, Registry, RegistryEntry};
pub use source::SourceFile;
pub use target::Target;
