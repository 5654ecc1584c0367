use std::path::{Path, PathBuf};

use config::shared::{ImportConfig, MissingFilePolicy};
use tempfile::TempDir;

/// One small, valid snapshot file per table. Every line references the same locality.
pub const SAMPLE_SNAPSHOT: &[(&str, &[&str])] = &[
    ("LOG_FAIXA_UF.TXT", &["SP@01000000@19999999"]),
    (
        "LOG_LOCALIDADE.TXT",
        &[
            "96@SP@São Paulo@@0@M@@S Paulo@3550308",
            "42@SP@Campinas@13000000@0@M@@Campinas@3509502",
        ],
    ),
    ("LOG_VAR_LOC.TXT", &["96@1@Sampa"]),
    ("LOG_FAIXA_LOCALIDADE.TXT", &["96@01000000@05999999@C"]),
    ("LOG_BAIRRO.TXT", &["1@SP@96@Sé@"]),
    ("LOG_VAR_BAI.TXT", &["1@1@Centro Velho"]),
    ("LOG_FAIXA_BAIRRO.TXT", &["1@01001000@01099999"]),
    ("LOG_CPC.TXT", &["10@SP@96@CPC Vila Nova@Rua Augusta, 10@01001500"]),
    ("LOG_FAIXA_CPC.TXT", &["10@1@500"]),
    (
        "LOG_LOGRADOURO_SP.TXT",
        &["100@SP@96@1@@da Sé@- lado ímpar@01001000@Praça@S@Pç da Sé"],
    ),
    ("LOG_VAR_LOG.TXT", &["100@1@Praça@Sé"]),
    ("LOG_NUM_SEC.TXT", &["100@1@99@I"]),
    (
        "LOG_GRANDE_USUARIO.TXT",
        &["7@SP@96@1@100@Banco Central@Av Paulista 1804@01310200@BC"],
    ),
    (
        "LOG_UNID_OPER.TXT",
        &["20@SP@96@1@100@AC Sé@Praça da Sé 108@01001900@S@AC Sé"],
    ),
    ("LOG_FAIXA_UOP.TXT", &["20@1@300"]),
    ("ECT_PAIS.TXT", &["BR@BRA@Brasil@Brazil@Brésil@BR"]),
];

/// Rows stored after loading [`SAMPLE_SNAPSHOT`].
pub const SAMPLE_ROWS: u64 = 17;

/// Non-null CEPs stored after loading [`SAMPLE_SNAPSHOT`].
pub const SAMPLE_CEPS: u64 = 5;

/// Writes `lines` to `path` encoded as Latin-1, each terminated by a newline.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_latin1(path: &Path, lines: &[&str]) {
    let mut content = lines.join("\n");
    content.push('\n');

    let encoded: Vec<u8> = content
        .chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect();
    std::fs::write(path, encoded).expect("Failed to write fixture file");
}

/// Temporary eDNE directory layout with a snapshot and a delta directory.
///
/// Both directories are removed when the value is dropped.
#[derive(Debug)]
pub struct EdneFiles {
    _root: TempDir,
    snapshot_dir: PathBuf,
    delta_dir: PathBuf,
}

impl EdneFiles {
    /// # Panics
    ///
    /// Panics if the directories cannot be created.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create temporary directory");
        let snapshot_dir = root.path().join("basico");
        let delta_dir = root.path().join("delta");
        std::fs::create_dir_all(&snapshot_dir).expect("Failed to create snapshot directory");
        std::fs::create_dir_all(&delta_dir).expect("Failed to create delta directory");

        Self {
            _root: root,
            snapshot_dir,
            delta_dir,
        }
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn delta_dir(&self) -> &Path {
        &self.delta_dir
    }

    pub fn write_snapshot(&self, file_name: &str, lines: &[&str]) -> PathBuf {
        let path = self.snapshot_dir.join(file_name);
        write_latin1(&path, lines);
        path
    }

    pub fn write_delta(&self, file_name: &str, lines: &[&str]) -> PathBuf {
        let path = self.delta_dir.join(file_name);
        write_latin1(&path, lines);
        path
    }

    /// Writes every file of [`SAMPLE_SNAPSHOT`].
    pub fn write_sample_snapshot(&self) {
        for (file_name, lines) in SAMPLE_SNAPSHOT {
            self.write_snapshot(file_name, lines);
        }
    }

    /// Writes an empty delta file for every table that has one.
    pub fn write_empty_deltas(&self) {
        for table in crate::tables::ALL_TABLES {
            if let Some(layout) = table.delta {
                std::fs::write(self.delta_dir.join(layout.file()), b"")
                    .expect("Failed to write fixture file");
            }
        }
    }

    /// Import configuration reading from this layout.
    pub fn import_config(&self, missing_files: MissingFilePolicy) -> ImportConfig {
        ImportConfig {
            schema: ImportConfig::DEFAULT_SCHEMA.to_string(),
            snapshot_dir: self.snapshot_dir.clone(),
            delta_dir: self.delta_dir.clone(),
            delimiter: ImportConfig::DEFAULT_DELIMITER,
            missing_files,
            edne_version: Some("2024-test".to_string()),
        }
    }
}

impl Default for EdneFiles {
    fn default() -> Self {
        Self::new()
    }
}
