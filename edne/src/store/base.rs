use std::future::Future;

use crate::error::ImportResult;
use crate::record::{Field, Record};
use crate::report::RunReport;
use crate::tables::TableSpec;

/// Target of an import.
///
/// A store handle is cloned into every file task, so implementations share their underlying
/// connection or state between clones. Each call is applied on its own; there is no transaction
/// spanning several calls.
pub trait Store {
    /// Returns the name of the store.
    fn name() -> &'static str;

    /// Creates the schema namespace and the import report table.
    fn prepare(&self) -> impl Future<Output = ImportResult<()>> + Send;

    /// Creates `table` unless it already exists.
    fn create_table(
        &self,
        table: &'static TableSpec,
    ) -> impl Future<Output = ImportResult<()>> + Send;

    /// Inserts `record`, overwriting every non-key column when the key already exists.
    fn upsert(
        &self,
        table: &'static TableSpec,
        record: &Record,
    ) -> impl Future<Output = ImportResult<()>> + Send;

    /// Deletes the row whose key columns all equal `key`. Returns the number of deleted rows.
    fn delete(
        &self,
        table: &'static TableSpec,
        key: &[Field],
    ) -> impl Future<Output = ImportResult<u64>> + Send;

    fn count_rows(
        &self,
        table: &'static TableSpec,
    ) -> impl Future<Output = ImportResult<u64>> + Send;

    /// Counts the rows of `table` where `column` is not null.
    fn count_non_null(
        &self,
        table: &'static TableSpec,
        column: &'static str,
    ) -> impl Future<Output = ImportResult<u64>> + Send;

    /// Persists the report of a finished run.
    fn record_run(&self, report: &RunReport) -> impl Future<Output = ImportResult<()>> + Send;
}
