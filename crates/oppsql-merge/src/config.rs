use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};
use crate::sql::{validate_identifier, validate_schema_alias};

/// Configuration for a merge run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Name of the registry table mapping `dbId` to source names.
    pub registry_table: String,
    /// Schema alias a source is attached under while it is copied.
    pub attach_alias: String,
    /// Run-metadata tables that are deduplicated instead of copied per source.
    pub shared_tables: Vec<String>,
    /// Strip `"` from run attribute and parameter values after merging.
    pub strip_quotes: bool,
    /// File extensions recognized as result files.
    pub source_extensions: Vec<String>,
    /// Extension of a derived output file name.
    pub output_extension: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            registry_table: "db".into(),
            attach_alias: "src".into(),
            shared_tables: vec!["run".into(), "runattr".into(), "runparam".into()],
            strip_quotes: false,
            source_extensions: vec!["sca".into(), "vec".into()],
            output_extension: "db".into(),
        }
    }
}

impl MergeConfig {
    /// Parse a TOML document. Missing keys fall back to the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every identifier that will end up inside SQL.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.registry_table)?;
        validate_schema_alias(&self.attach_alias)?;
        if self.shared_tables.iter().any(|t| *t == self.registry_table) {
            return Err(MergeError::Config(format!(
                "registry table {:?} cannot be a shared table",
                self.registry_table
            )));
        }
        if self.source_extensions.is_empty() {
            return Err(MergeError::Config("no source extensions configured".into()));
        }
        if self.output_extension.is_empty()
            || self.source_extensions.contains(&self.output_extension)
        {
            return Err(MergeError::Config(format!(
                "output extension {:?} must be non-empty and differ from source extensions",
                self.output_extension
            )));
        }
        Ok(())
    }

    /// Whether `table` is deduplicated rather than copied per source.
    pub fn is_shared(&self, table: &str) -> bool {
        self.shared_tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }
}
