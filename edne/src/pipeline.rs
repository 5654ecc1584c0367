//! Runs the snapshot and delta phases of an import.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use config::shared::ImportConfig;
use futures::future::try_join_all;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span};

use crate::error::{ImportError, ImportResult};
use crate::file::resolve_files;
use crate::load::{FileReport, apply_delta_file, load_snapshot_file};
use crate::store::Store;
use crate::tables::{ALL_TABLES, TableSpec, cep_tables};

pub use crate::report::{Phase, PhaseReport, RunReport, RunSummary};

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhaseSelection {
    #[default]
    All,
    SnapshotOnly,
    DeltaOnly,
}

impl PhaseSelection {
    pub fn includes(&self, phase: Phase) -> bool {
        matches!(
            (self, phase),
            (PhaseSelection::All, _)
                | (PhaseSelection::SnapshotOnly, Phase::Snapshot)
                | (PhaseSelection::DeltaOnly, Phase::Delta)
        )
    }
}

impl FromStr for PhaseSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PhaseSelection::All),
            "snapshot" => Ok(PhaseSelection::SnapshotOnly),
            "delta" => Ok(PhaseSelection::DeltaOnly),
            other => Err(format!(
                "unknown phase `{other}`, expected one of: all, snapshot, delta"
            )),
        }
    }
}

impl fmt::Display for PhaseSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseSelection::All => f.write_str("all"),
            PhaseSelection::SnapshotOnly => f.write_str("snapshot"),
            PhaseSelection::DeltaOnly => f.write_str("delta"),
        }
    }
}

/// Imports the eDNE files into a [`Store`].
///
/// Every table is created before any file is read. Each phase runs one task per file and waits
/// for all of them; the delta phase only starts once every snapshot task has succeeded.
#[derive(Debug)]
pub struct Importer<S> {
    config: ImportConfig,
    store: S,
    phases: PhaseSelection,
}

impl<S> Importer<S>
where
    S: Store + Clone + Send + Sync + 'static,
{
    pub fn new(config: ImportConfig, store: S) -> Self {
        Self {
            config,
            store,
            phases: PhaseSelection::All,
        }
    }

    pub fn with_phases(mut self, phases: PhaseSelection) -> Self {
        self.phases = phases;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&self) -> ImportResult<RunSummary> {
        let started = Instant::now();
        info!(
            store = S::name(),
            phases = %self.phases,
            snapshot_dir = %self.config.snapshot_dir.display(),
            delta_dir = %self.config.delta_dir.display(),
            "starting import"
        );

        self.store.prepare().await?;
        try_join_all(ALL_TABLES.iter().map(|&table| self.store.create_table(table))).await?;

        let mut phases = vec![];
        for phase in [Phase::Snapshot, Phase::Delta] {
            if self.phases.includes(phase) {
                phases.push(self.run_phase(phase).await?);
            }
        }

        let total_records = self.count_records().await?;
        let total_ceps = self.count_ceps().await?;

        let summary = RunSummary {
            phases,
            total_records,
            total_ceps,
            elapsed: started.elapsed(),
        };

        let report = RunReport::from_summary(&summary, self.config.edne_version.clone());
        self.store.record_run(&report).await?;

        info!(
            total_lines = summary.total_lines(),
            total_bytes = summary.total_bytes(),
            total_records,
            total_ceps,
            elapsed_ms = report.duration_ms,
            "import finished"
        );

        Ok(summary)
    }

    async fn run_phase(&self, phase: Phase) -> ImportResult<PhaseReport> {
        let files = self.phase_files(phase).await?;
        info!(%phase, files = files.len(), "starting phase");

        let delimiter = self.config.delimiter;
        let mut join_set = JoinSet::new();
        for (table, path) in files {
            let store = self.store.clone();
            let span = info_span!("file", %phase, table = table.name, path = %path.display());

            join_set.spawn(
                async move {
                    match phase {
                        Phase::Snapshot => load_snapshot_file(&store, table, &path, delimiter).await,
                        Phase::Delta => apply_delta_file(&store, table, &path, delimiter).await,
                    }
                }
                .instrument(span),
            );
        }

        let reports = wait_all(join_set).await?;
        let report = PhaseReport::new(phase, reports);

        info!(
            %phase,
            files = report.files.len(),
            lines = report.total_lines(),
            bytes = report.total_bytes(),
            "phase finished"
        );

        Ok(report)
    }

    /// Resolves the files of every table for `phase`. Nothing is spawned if any lookup fails.
    async fn phase_files(
        &self,
        phase: Phase,
    ) -> ImportResult<Vec<(&'static TableSpec, PathBuf)>> {
        let (dir, sources): (&Path, Vec<_>) = match phase {
            Phase::Snapshot => (
                self.config.snapshot_dir.as_path(),
                ALL_TABLES
                    .iter()
                    .map(|&table| (table, table.snapshot))
                    .collect(),
            ),
            Phase::Delta => (
                self.config.delta_dir.as_path(),
                ALL_TABLES
                    .iter()
                    .filter_map(|&table| table.delta.map(|layout| (table, layout.source())))
                    .collect(),
            ),
        };

        let mut files = vec![];
        let mut errors = vec![];
        for (table, source) in sources {
            match resolve_files(dir, source, self.config.missing_files).await {
                Ok(paths) => files.extend(paths.into_iter().map(|path| (table, path))),
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(files)
    }

    async fn count_records(&self) -> ImportResult<u64> {
        let counts =
            try_join_all(ALL_TABLES.iter().map(|&table| self.store.count_rows(table))).await?;

        Ok(counts.into_iter().sum())
    }

    async fn count_ceps(&self) -> ImportResult<u64> {
        let counts =
            try_join_all(cep_tables().map(|table| self.store.count_non_null(table, "cep"))).await?;

        Ok(counts.into_iter().sum())
    }
}

/// Waits for every task of the group, collecting all failures.
async fn wait_all(
    mut join_set: JoinSet<ImportResult<FileReport>>,
) -> ImportResult<Vec<FileReport>> {
    let mut reports = vec![];
    let mut errors: Vec<ImportError> = vec![];

    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(err)) => {
                error!(error = %err, "file task failed");
                errors.push(err);
            }
            Err(join_err) => {
                error!(error = %join_err, "file task did not complete");
                errors.push(join_err.into());
            }
        }
    }

    if errors.is_empty() {
        Ok(reports)
    } else {
        Err(errors.into())
    }
}
