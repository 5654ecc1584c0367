use std::path::Path;

use tracing::info;

use crate::error::ImportResult;
use crate::file::LineReader;
use crate::load::{FileReport, line_error};
use crate::record::parse_snapshot_line;
use crate::store::Store;
use crate::tables::TableSpec;

/// Upserts every line of a snapshot file into `table`.
///
/// The table must already exist. Rows missing from the file are left untouched.
pub async fn load_snapshot_file<S>(
    store: &S,
    table: &'static TableSpec,
    path: &Path,
    delimiter: char,
) -> ImportResult<FileReport>
where
    S: Store,
{
    let mut report = FileReport::new(table.name, path);
    let mut reader = LineReader::open(path).await?;
    let mut line_number = 0;

    while let Some(line) = reader.next_line().await? {
        line_number += 1;
        let result = match parse_snapshot_line(table, line, delimiter) {
            Ok(record) => store.upsert(table, &record).await,
            Err(err) => Err(err),
        };
        result.map_err(|err| line_error(err, &report.file_name, line_number))?;

        report.inserts += 1;
    }

    report.lines = reader.lines_read();
    report.bytes = reader.bytes_read();

    info!(
        table = table.name,
        file = %report.file_name,
        lines = report.lines,
        bytes = report.bytes,
        "snapshot file loaded"
    );

    Ok(report)
}
