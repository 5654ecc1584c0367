use config::shared::ImporterConfig;
use edne::pipeline::{Importer, PhaseSelection, RunSummary};
use edne::store::Store;
use edne::store::memory::MemoryStore;
use edne::store::postgres::PostgresStore;
use tracing::info;

use crate::error::ImporterResult;

/// Runs the selected phases against Postgres, or against a [`MemoryStore`] on a dry run.
pub async fn start_import(
    config: ImporterConfig,
    phases: PhaseSelection,
    dry_run: bool,
) -> ImporterResult<RunSummary> {
    log_config(&config, phases, dry_run);

    if dry_run {
        return run(Importer::new(config.import, MemoryStore::new()).with_phases(phases)).await;
    }

    let store = PostgresStore::connect(&config.database, config.import.schema.clone()).await?;
    run(Importer::new(config.import, store).with_phases(phases)).await
}

async fn run<S>(importer: Importer<S>) -> ImporterResult<RunSummary>
where
    S: Store + Clone + Send + Sync + 'static,
{
    Ok(importer.run().await?)
}

fn log_config(config: &ImporterConfig, phases: PhaseSelection, dry_run: bool) {
    let database = &config.database;
    let import = &config.import;

    info!(
        host = %database.host,
        port = database.port,
        dbname = %database.name,
        username = %database.username,
        tls_enabled = database.tls.enabled,
        schema = %import.schema,
        snapshot_dir = %import.snapshot_dir.display(),
        delta_dir = %import.delta_dir.display(),
        missing_files = ?import.missing_files,
        %phases,
        dry_run,
        "importer configuration"
    );
}
