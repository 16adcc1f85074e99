use std::path::PathBuf;

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attach::Attachment;
use crate::catalog::{TableCatalog, TableDescriptor};
use crate::config::MergeConfig;
use crate::dedup::{DedupDecision, DedupPolicy};
use crate::error::{MergeError, Result};
use crate::postprocess::strip_quotes;
use crate::registry::{DbId, Registry};
use crate::schema;
use crate::source::{logical_names, SourceFile};

/// What merging one source file did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub path: PathBuf,
    pub db_id: DbId,
    /// Total rows inserted across all tables.
    pub rows_copied: usize,
    /// Tables rows were copied from.
    pub tables_copied: Vec<String>,
    /// Shared tables skipped because their rows were already merged.
    pub tables_deduplicated: Vec<String>,
}

/// Summary of a complete merge run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub tables_created: Vec<String>,
    pub registered: usize,
    pub sources: Vec<SourceReport>,
    /// Rows changed by quote stripping, if it ran.
    pub quotes_stripped: Option<usize>,
}

impl MergeReport {
    pub fn rows_copied(&self) -> usize {
        self.sources.iter().map(|s| s.rows_copied).sum()
    }
}

/// Merges result databases into one target connection.
///
/// The merger owns the connection for the whole run. Sources are processed
/// one after another; each is attached, copied inside a single transaction,
/// committed, and detached before the next one is touched. A failure aborts
/// the run: sources committed before it stay in the target, the failing
/// source leaves nothing behind.
pub struct Merger {
    conn: Connection,
    config: MergeConfig,
    registry: Registry,
    dedup: DedupPolicy,
}

impl std::fmt::Debug for Merger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merger")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

impl Merger {
    pub fn new(conn: Connection, config: MergeConfig) -> Result<Self> {
        config.validate()?;
        let registry = Registry::new(&config.registry_table)?;
        Ok(Self {
            conn,
            config,
            registry,
            dedup: DedupPolicy,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Merge all `sources` into the target, in the order given.
    ///
    /// Unifies the schema, registers every distinct source name, loads the
    /// table catalog once, merges each source and finally strips quotes if
    /// the configuration asks for it.
    pub fn merge_all(&mut self, sources: &[SourceFile]) -> Result<MergeReport> {
        if sources.is_empty() {
            warn!("no source files to merge");
        }

        let mut report = MergeReport {
            tables_created: self.unify_schema(sources)?,
            ..MergeReport::default()
        };

        self.registry.create(&self.conn)?;
        let ids = self.registry.register(&self.conn, &logical_names(sources))?;
        report.registered = ids.len();

        let catalog = TableCatalog::load(&self.conn, &self.config)?;
        debug!(tables = catalog.len(), "loaded table catalog");

        for (index, source) in sources.iter().enumerate() {
            info!(
                "merging {} ({}/{})",
                source.path.display(),
                index + 1,
                sources.len()
            );
            report.sources.push(self.merge_source(source, &catalog)?);
        }

        if self.config.strip_quotes {
            report.quotes_stripped = Some(strip_quotes(&self.conn)?);
        }

        info!(
            sources = sources.len(),
            rows = report.rows_copied(),
            "merge complete"
        );
        Ok(report)
    }

    /// Create every table any of `sources` defines in the target.
    pub fn unify_schema(&mut self, sources: &[SourceFile]) -> Result<Vec<String>> {
        schema::unify(
            &self.conn,
            sources,
            &self.config.registry_table,
            &self.config.attach_alias,
        )
    }

    /// Copy one registered source into the target as a single transaction.
    pub fn merge_source(
        &mut self,
        source: &SourceFile,
        catalog: &TableCatalog,
    ) -> Result<SourceReport> {
        let db_id = self.registry.lookup(&self.conn, &source.name)?;
        let attachment = Attachment::attach(&self.conn, source.path(), &self.config.attach_alias)?;
        // Declared after the attachment so it is dropped (rolled back) first.
        let tx = self.conn.unchecked_transaction()?;

        let mut report = SourceReport {
            name: source.name.clone(),
            path: source.path.clone(),
            db_id,
            rows_copied: 0,
            tables_copied: Vec::new(),
            tables_deduplicated: Vec::new(),
        };

        for table in catalog.tables() {
            if !attachment.has_table(&table.name)? {
                continue;
            }
            check_columns(&tx, &attachment, table)?;
            if table.shared {
                let decision = self.dedup.check(&tx, attachment.alias(), table, db_id)?;
                if decision == DedupDecision::AlreadyRepresented {
                    debug!(table = %table.name, source = %source.name, "already merged, skipping");
                    report.tables_deduplicated.push(table.name.clone());
                    continue;
                }
            }
            let rows = copy_table(&tx, &attachment, table, db_id)?;
            debug!(table = %table.name, rows, "copied table");
            report.rows_copied += rows;
            report.tables_copied.push(table.name.clone());
        }

        tx.commit()?;
        drop(attachment);

        info!(
            source = %source.name,
            db_id,
            rows = report.rows_copied,
            skipped = report.tables_deduplicated.len(),
            "committed source"
        );
        Ok(report)
    }
}

/// Every target column must exist in the source table. A missing column
/// would otherwise be read as a string literal by SQLite's quoted-identifier
/// fallback.
fn check_columns(
    conn: &Connection,
    attachment: &Attachment<'_>,
    table: &TableDescriptor,
) -> Result<()> {
    let present: Vec<String> = schema::table_columns(conn, attachment.alias(), &table.name)?
        .into_iter()
        .map(|c| c.name)
        .collect();
    match table.columns.iter().find(|c| !present.contains(c)) {
        Some(column) => Err(MergeError::IncompatibleTable {
            table: table.name.clone(),
            column: column.clone(),
            path: attachment.path().to_path_buf(),
        }),
        None => Ok(()),
    }
}

fn copy_table(
    conn: &Connection,
    attachment: &Attachment<'_>,
    table: &TableDescriptor,
    db_id: DbId,
) -> Result<usize> {
    conn.execute(&table.insert_sql(attachment.alias()), params![db_id])
        .map_err(|source| MergeError::Copy {
            table: table.name.clone(),
            path: attachment.path().to_path_buf(),
            source,
        })
}
