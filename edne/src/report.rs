//! Results of file tasks and of whole runs.
//!
//! Every file task returns its own [`FileReport`]; the phase runner folds them into
//! [`PhaseReport`]s and a final [`RunSummary`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Processing phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Snapshot,
    Delta,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Snapshot => f.write_str("snapshot"),
            Phase::Delta => f.write_str("delta"),
        }
    }
}

/// Outcome of importing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub table: &'static str,
    pub file_name: String,
    pub lines: u64,
    pub bytes: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

impl FileReport {
    pub fn new(table: &'static str, path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            table,
            file_name,
            ..Default::default()
        }
    }

    /// Number of write operations sent to the store.
    pub fn operations(&self) -> u64 {
        self.inserts + self.updates + self.deletes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub files: Vec<FileReport>,
}

impl PhaseReport {
    pub fn new(phase: Phase, mut files: Vec<FileReport>) -> Self {
        files.sort_by(|a, b| (a.table, &a.file_name).cmp(&(b.table, &b.file_name)));

        Self { phase, files }
    }

    pub fn total_lines(&self) -> u64 {
        self.files.iter().map(|file| file.lines).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.bytes).sum()
    }

    pub fn total_deletes(&self) -> u64 {
        self.files.iter().map(|file| file.deletes).sum()
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub phases: Vec<PhaseReport>,
    /// Rows stored across every reference table after the run.
    pub total_records: u64,
    /// Non-null CEPs across the tables that carry one.
    pub total_ceps: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|report| report.phase == phase)
    }

    pub fn total_lines(&self) -> u64 {
        self.phases.iter().map(PhaseReport::total_lines).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.phases.iter().map(PhaseReport::total_bytes).sum()
    }

    /// Average read throughput in MiB per second.
    pub fn throughput_mib(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }

        self.total_bytes() as f64 / BYTES_PER_MIB / seconds
    }
}

/// Row written to the import report table at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub total_records: i64,
    pub total_ceps: i64,
    pub edne_version: Option<String>,
    pub duration_ms: i64,
    pub notes: Option<String>,
}

impl RunReport {
    pub fn from_summary(summary: &RunSummary, edne_version: Option<String>) -> Self {
        let notes = summary
            .phases
            .iter()
            .map(|report| {
                format!(
                    "{}: {} files, {} lines",
                    report.phase,
                    report.files.len(),
                    report.total_lines()
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            total_records: i64::try_from(summary.total_records).unwrap_or(i64::MAX),
            total_ceps: i64::try_from(summary.total_ceps).unwrap_or(i64::MAX),
            edne_version,
            duration_ms: i64::try_from(summary.elapsed.as_millis()).unwrap_or(i64::MAX),
            notes: (!notes.is_empty()).then_some(notes),
        }
    }
}
