use std::path::PathBuf;

use clap::Parser;
use config::load_config;
use config::shared::{ImporterConfig, MissingFilePolicy};
use edne::pipeline::PhaseSelection;

use crate::error::{ImporterError, ImporterResult};

/// Command line arguments. Every option overrides the value from the configuration files.
#[derive(Debug, Parser)]
#[command(name = "importer", version, about = "Imports the Correios eDNE files into Postgres")]
pub struct Cli {
    /// Directory with the full snapshot files
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Directory with the delta files
    #[arg(long)]
    pub delta_dir: Option<PathBuf>,

    /// Schema that holds the reference tables
    #[arg(long)]
    pub schema: Option<String>,

    /// Release label stored with the run report
    #[arg(long)]
    pub edne_version: Option<String>,

    /// Fail when an expected file is missing instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Phases to run: all, snapshot or delta
    #[arg(long, default_value_t = PhaseSelection::All)]
    pub phase: PhaseSelection,

    /// Read and validate every file against an in-memory store without connecting to Postgres
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Loads and validates the importer configuration, applying the command line overrides.
pub fn load_importer_config(cli: &Cli) -> ImporterResult<ImporterConfig> {
    let mut config = load_config::<ImporterConfig>().map_err(ImporterError::config)?;
    apply_overrides(&mut config, cli);
    config.validate().map_err(ImporterError::config)?;

    Ok(config)
}

fn apply_overrides(config: &mut ImporterConfig, cli: &Cli) {
    let import = &mut config.import;

    if let Some(dir) = &cli.snapshot_dir {
        import.snapshot_dir = dir.clone();
    }
    if let Some(dir) = &cli.delta_dir {
        import.delta_dir = dir.clone();
    }
    if let Some(schema) = &cli.schema {
        import.schema = schema.clone();
    }
    if let Some(version) = &cli.edne_version {
        import.edne_version = Some(version.clone());
    }
    if cli.strict {
        import.missing_files = MissingFilePolicy::Strict;
    }
}
