use std::path::Path;

use tracing::{debug, info};

use crate::error::ImportResult;
use crate::file::LineReader;
use crate::load::{FileReport, line_error};
use crate::record::{DeltaLine, Operation, parse_delta_line};
use crate::store::Store;
use crate::tables::TableSpec;

/// Applies the operations of a delta file to `table`, in file order.
///
/// Inserts and updates upsert the record, deletes remove the row matching every key column and
/// are a no-op when no row matches. The first failing line stops the file; lines before it stay
/// applied.
pub async fn apply_delta_file<S>(
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
        let operation = apply_line(store, table, line, delimiter)
            .await
            .map_err(|err| line_error(err, &report.file_name, line_number))?;

        match operation {
            Operation::Insert => report.inserts += 1,
            Operation::Update => report.updates += 1,
            Operation::Delete => report.deletes += 1,
        }
    }

    report.lines = reader.lines_read();
    report.bytes = reader.bytes_read();

    info!(
        table = table.name,
        file = %report.file_name,
        lines = report.lines,
        bytes = report.bytes,
        inserts = report.inserts,
        updates = report.updates,
        deletes = report.deletes,
        "delta file applied"
    );

    Ok(report)
}

async fn apply_line<S>(
    store: &S,
    table: &'static TableSpec,
    line: &str,
    delimiter: char,
) -> ImportResult<Operation>
where
    S: Store,
{
    let DeltaLine { operation, record } = parse_delta_line(table, line, delimiter)?;

    match operation {
        Operation::Insert | Operation::Update => store.upsert(table, &record).await?,
        Operation::Delete => {
            let deleted = store.delete(table, &record.key(table)).await?;
            if deleted == 0 {
                debug!(table = table.name, key = ?record.key(table), "delete matched no row");
            }
        }
    }

    Ok(operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::memory::MemoryStore;
    use crate::tables::{LOG_BAIRRO, LOG_LOCALIDADE};
    use crate::test_utils::fixtures::write_latin1;

    #[tokio::test]
    async fn operations_are_applied_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DELTA_LOG_BAIRRO.TXT");
        write_latin1(
            &path,
            &[
                "1@SP@96@Centro@@INS",
                "1@SP@96@Centro Historico@Ctr@UPD",
                "2@SP@96@Luz@@INS",
                "2@SP@96@Luz@@DEL",
                "3@SP@96@Bras@@DEL",
            ],
        );

        let store = MemoryStore::new();
        store.create_table(&LOG_BAIRRO).await.unwrap();

        let report = apply_delta_file(&store, &LOG_BAIRRO, &path, '@').await.unwrap();

        assert_eq!((report.inserts, report.updates, report.deletes), (2, 1, 2));
        assert_eq!(report.lines, 5);
        assert_eq!(store.count_rows(&LOG_BAIRRO).await.unwrap(), 1);
        let row = store.get(&LOG_BAIRRO, &["1"]).await.unwrap();
        assert_eq!(row.get(3), Some("Centro Historico"));
    }

    #[tokio::test]
    async fn applying_a_file_twice_leaves_the_same_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DELTA_LOG_BAIRRO.TXT");
        write_latin1(
            &path,
            &[
                "1@SP@96@Centro@@INS",
                "1@SP@96@Centro Historico@Ctr@UPD",
                "2@SP@96@Luz@@INS",
                "2@SP@96@Luz@@DEL",
                "3@SP@96@Bras@@DEL",
                "4@SP@96@Liberdade@@UPD",
            ],
        );

        let store = MemoryStore::new();
        store.create_table(&LOG_BAIRRO).await.unwrap();

        apply_delta_file(&store, &LOG_BAIRRO, &path, '@').await.unwrap();
        let first = store.rows(&LOG_BAIRRO).await;
        apply_delta_file(&store, &LOG_BAIRRO, &path, '@').await.unwrap();
        let second = store.rows(&LOG_BAIRRO).await;

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unsupported_operation_stops_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DELTA_LOG_BAIRRO.TXT");
        write_latin1(
            &path,
            &["1@SP@96@Centro@@INS", "2@SP@96@Luz@@MRG", "3@SP@96@Bras@@INS"],
        );

        let store = MemoryStore::new();
        store.create_table(&LOG_BAIRRO).await.unwrap();

        let err = apply_delta_file(&store, &LOG_BAIRRO, &path, '@')
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert!(err.detail().unwrap().starts_with("DELTA_LOG_BAIRRO.TXT line 2"));
        assert!(store.get(&LOG_BAIRRO, &["1"]).await.is_some());
        assert!(store.get(&LOG_BAIRRO, &["3"]).await.is_none());
    }

    #[tokio::test]
    async fn update_stores_the_replacement_cep() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DELTA_LOG_LOCALIDADE.TXT");
        write_latin1(
            &path,
            &[
                "42@SP@Campinas@13000000@0@M@@@3509502@INS@",
                "42@SP@Campinas@13000000@0@M@@@3509502@UPD@13000999",
            ],
        );

        let store = MemoryStore::new();
        store.create_table(&LOG_LOCALIDADE).await.unwrap();

        apply_delta_file(&store, &LOG_LOCALIDADE, &path, '@').await.unwrap();

        let row = store.get(&LOG_LOCALIDADE, &["42"]).await.unwrap();
        assert_eq!(row.get(3), Some("13000999"));
    }
}
