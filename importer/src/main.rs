//! eDNE importer binary.
//!
//! Loads the configuration, initializes tracing, connects to Postgres and runs the snapshot and
//! delta phases, then prints the run summary.

use clap::Parser;
use tracing::error;

use crate::config::{Cli, load_importer_config};
use crate::core::start_import;
use crate::error::{ImporterError, ImporterResult};
use crate::summary::{render_json, render_summary};

mod config;
mod core;
mod error;
mod summary;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprint!("{}", err.render_report());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> ImporterResult<()> {
    let config = load_importer_config(&cli)?;

    let _log_flusher =
        telemetry::tracing::init_tracing(env!("CARGO_BIN_NAME")).map_err(ImporterError::config)?;

    // A provider may already be installed by a dependency.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_import(config, cli.phase, cli.dry_run));
    if let Err(err) = &result {
        error!("{err}");
    }
    let summary = result?;

    if cli.json {
        let json = render_json(&summary).map_err(std::io::Error::other)?;
        println!("{json}");
    } else {
        print!("{}", render_summary(&summary));
    }

    Ok(())
}
