use std::path::PathBuf;

use serde::Deserialize;

use crate::Config;
use crate::shared::{PgConnectionConfig, ValidationError};

/// What to do when an expected snapshot or delta file is not present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFilePolicy {
    /// Skip the table and log a warning. Delta releases routinely omit unchanged tables.
    #[default]
    Lenient,
    /// Fail the run.
    Strict,
}

/// Settings for locating and parsing the eDNE files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImportConfig {
    /// Schema that holds every reference table.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Directory with the full snapshot (`basico`) files.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// Directory with the delta files.
    #[serde(default = "default_delta_dir")]
    pub delta_dir: PathBuf,
    /// Field delimiter used in every file.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub missing_files: MissingFilePolicy,
    /// Release label of the eDNE files, stored with the run report.
    #[serde(default)]
    pub edne_version: Option<String>,
}

impl ImportConfig {
    pub const DEFAULT_SCHEMA: &'static str = "correios";
    pub const DEFAULT_SNAPSHOT_DIR: &'static str = "eDNE/basico";
    pub const DEFAULT_DELTA_DIR: &'static str = "eDNE/delta";
    pub const DEFAULT_DELIMITER: char = '@';

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema.trim().is_empty() {
            return Err(ValidationError::EmptySchema);
        }

        if self.delimiter.is_alphanumeric() || self.delimiter.is_whitespace() {
            return Err(ValidationError::InvalidDelimiter(self.delimiter));
        }

        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            snapshot_dir: default_snapshot_dir(),
            delta_dir: default_delta_dir(),
            delimiter: default_delimiter(),
            missing_files: MissingFilePolicy::default(),
            edne_version: None,
        }
    }
}

fn default_schema() -> String {
    ImportConfig::DEFAULT_SCHEMA.to_string()
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(ImportConfig::DEFAULT_SNAPSHOT_DIR)
}

fn default_delta_dir() -> PathBuf {
    PathBuf::from(ImportConfig::DEFAULT_DELTA_DIR)
}

fn default_delimiter() -> char {
    ImportConfig::DEFAULT_DELIMITER
}

/// Top level configuration of the importer binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImporterConfig {
    pub database: PgConnectionConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl ImporterConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.tls.validate()?;
        self.import.validate()
    }
}

impl Config for ImporterConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
