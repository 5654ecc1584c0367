//! Locating and reading eDNE input files.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

pub use config::shared::MissingFilePolicy;

use crate::bail;
use crate::error::{ErrorKind, ImportResult};
use crate::tables::SnapshotSource;

/// Extension of every eDNE data file.
const FILE_EXTENSION: &str = "TXT";

/// Returns the files backing `source` in `dir`.
///
/// Per-state sources match `{prefix}_*.TXT` and are returned sorted by file name. A source with
/// several accepted names resolves to the first one present. When nothing matches, a lenient policy returns an empty list and a strict policy fails with
/// [`ErrorKind::MissingFile`].
pub async fn resolve_files(
    dir: &Path,
    source: SnapshotSource,
    policy: MissingFilePolicy,
) -> ImportResult<Vec<PathBuf>> {
    let files = match source {
        SnapshotSource::Single(file_name) => {
            let path = dir.join(file_name);
            if tokio::fs::try_exists(&path).await? {
                vec![path]
            } else {
                vec![]
            }
        }
        SnapshotSource::PerState { prefix } => find_per_state_files(dir, prefix).await?,
        SnapshotSource::FirstOf(file_names) => {
            let mut found = vec![];
            for file_name in file_names {
                let path = dir.join(file_name);
                if tokio::fs::try_exists(&path).await? {
                    found.push(path);
                    break;
                }
            }
            found
        }
    };

    if !files.is_empty() {
        debug!(dir = %dir.display(), count = files.len(), "resolved input files");
        return Ok(files);
    }

    let expected = match source {
        SnapshotSource::Single(file_name) => file_name.to_string(),
        SnapshotSource::PerState { prefix } => format!("{prefix}_*.{FILE_EXTENSION}"),
        SnapshotSource::FirstOf(file_names) => file_names.join(" or "),
    };

    match policy {
        MissingFilePolicy::Lenient => {
            warn!(dir = %dir.display(), file = %expected, "input file not found, skipping");
            Ok(vec![])
        }
        MissingFilePolicy::Strict => bail!(
            ErrorKind::MissingFile,
            "Input file not found",
            format!("{} in {}", expected, dir.display())
        ),
    }
}

async fn find_per_state_files(dir: &Path, prefix: &str) -> ImportResult<Vec<PathBuf>> {
    if !tokio::fs::try_exists(dir).await? {
        return Ok(vec![]);
    }

    let name_prefix = format!("{prefix}_");
    let mut files = vec![];

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        let has_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(FILE_EXTENSION));

        if !file_name.starts_with(&name_prefix) || !has_extension {
            continue;
        }

        if entry.file_type().await?.is_file() {
            files.push(path);
        }
    }

    files.sort();

    Ok(files)
}

/// Buffered reader over a Latin-1 encoded file.
///
/// Yields one decoded line at a time without its line terminator. Empty lines are skipped and
/// not counted.
#[derive(Debug)]
pub struct LineReader {
    reader: BufReader<File>,
    buffer: Vec<u8>,
    line: String,
    lines: u64,
    bytes: u64,
}

impl LineReader {
    pub async fn open(path: &Path) -> ImportResult<Self> {
        let file = File::open(path).await?;

        Ok(Self {
            reader: BufReader::new(file),
            buffer: Vec::with_capacity(512),
            line: String::with_capacity(512),
            lines: 0,
            bytes: 0,
        })
    }

    /// Reads the next non-empty line, or `None` at end of file.
    pub async fn next_line(&mut self) -> ImportResult<Option<&str>> {
        loop {
            self.buffer.clear();
            let read = self.reader.read_until(b'\n', &mut self.buffer).await?;
            if read == 0 {
                return Ok(None);
            }
            self.bytes += read as u64;

            let mut raw = self.buffer.as_slice();
            while let Some((&last, rest)) = raw.split_last() {
                if last == b'\n' || last == b'\r' {
                    raw = rest;
                } else {
                    break;
                }
            }

            if raw.is_empty() {
                continue;
            }

            self.lines += 1;
            self.line.clear();
            self.line.extend(raw.iter().map(|&byte| char::from(byte)));

            return Ok(Some(&self.line));
        }
    }

    /// Non-empty lines returned so far.
    pub fn lines_read(&self) -> u64 {
        self.lines
    }

    /// Raw bytes consumed so far, line terminators included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }
}
