use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, ImportResult};
use crate::record::{Field, Record};
use crate::report::RunReport;
use crate::store::Store;
use crate::tables::{ColumnType, TableSpec};

type Rows = BTreeMap<Vec<Field>, Record>;

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<&'static str, Rows>,
    runs: Vec<RunReport>,
}

/// In-memory store used by tests and dry runs.
///
/// Applies the same column checks as the Postgres tables: non-nullable columns reject absent
/// values, numeric columns reject non-numeric text and character columns reject values longer
/// than their declared length. Numeric key values are compared by value, so `007` and `7`
/// address the same row.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every row of `table` ordered by key.
    pub async fn rows(&self, table: &TableSpec) -> Vec<Record> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table.name)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the row of `table` with the given key.
    pub async fn get(&self, table: &TableSpec, key: &[&str]) -> Option<Record> {
        let key: Vec<Field> = key.iter().map(|value| Some(value.to_string())).collect();
        let key = canonical_key(table, &key);

        let inner = self.inner.lock().await;
        inner.tables.get(table.name)?.get(&key).cloned()
    }

    pub async fn has_table(&self, table: &TableSpec) -> bool {
        self.inner.lock().await.tables.contains_key(table.name)
    }

    pub async fn runs(&self) -> Vec<RunReport> {
        self.inner.lock().await.runs.clone()
    }
}

impl Store for MemoryStore {
    fn name() -> &'static str {
        "memory"
    }

    async fn prepare(&self) -> ImportResult<()> {
        Ok(())
    }

    async fn create_table(&self, table: &'static TableSpec) -> ImportResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.tables.contains_key(table.name) {
            inner.tables.insert(table.name, Rows::new());
            info!(table = table.name, "created in-memory table");
        }

        Ok(())
    }

    async fn upsert(&self, table: &'static TableSpec, record: &Record) -> ImportResult<()> {
        check_record(table, record)?;
        let key = canonical_key(table, &record.key(table));

        let mut inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get_mut(table.name) else {
            bail!(
                ErrorKind::StoreSchemaError,
                "Table does not exist",
                table.name
            );
        };

        rows.insert(key, record.clone());

        Ok(())
    }

    async fn delete(&self, table: &'static TableSpec, key: &[Field]) -> ImportResult<u64> {
        let key = canonical_key(table, key);

        let mut inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get_mut(table.name) else {
            bail!(
                ErrorKind::StoreSchemaError,
                "Table does not exist",
                table.name
            );
        };

        Ok(u64::from(rows.remove(&key).is_some()))
    }

    async fn count_rows(&self, table: &'static TableSpec) -> ImportResult<u64> {
        let inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get(table.name) else {
            bail!(
                ErrorKind::StoreSchemaError,
                "Table does not exist",
                table.name
            );
        };

        Ok(rows.len() as u64)
    }

    async fn count_non_null(
        &self,
        table: &'static TableSpec,
        column: &'static str,
    ) -> ImportResult<u64> {
        let Some(index) = table.columns.iter().position(|c| c.name == column) else {
            bail!(
                ErrorKind::StoreSchemaError,
                "Column does not exist",
                format!("{}.{}", table.name, column)
            );
        };

        let inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get(table.name) else {
            bail!(
                ErrorKind::StoreSchemaError,
                "Table does not exist",
                table.name
            );
        };

        Ok(rows.values().filter(|row| row.get(index).is_some()).count() as u64)
    }

    async fn record_run(&self, report: &RunReport) -> ImportResult<()> {
        self.inner.lock().await.runs.push(report.clone());

        Ok(())
    }
}

fn check_record(table: &TableSpec, record: &Record) -> ImportResult<()> {
    if record.len() != table.columns.len() {
        bail!(
            ErrorKind::InvalidData,
            "Unexpected number of fields",
            format!(
                "table {} expects {} fields, found {}",
                table.name,
                table.columns.len(),
                record.len()
            )
        );
    }

    for (index, column) in table.columns.iter().enumerate() {
        let Some(value) = record.get(index) else {
            if !column.nullable {
                bail!(
                    ErrorKind::ConstraintViolation,
                    "Null value in non-nullable column",
                    format!("{}.{}", table.name, column.name)
                );
            }
            continue;
        };

        match column.column_type {
            ColumnType::Numeric if !is_numeric(value) => bail!(
                ErrorKind::ConversionError,
                "Invalid numeric value",
                format!("{}.{} = `{}`", table.name, column.name, value)
            ),
            ColumnType::Char(len) | ColumnType::Varchar(len)
                if value.chars().count() > usize::from(len) =>
            {
                bail!(
                    ErrorKind::ConversionError,
                    "Value too long for column",
                    format!(
                        "{}.{} accepts {} characters, got `{}`",
                        table.name, column.name, len, value
                    )
                )
            }
            _ => {}
        }
    }

    Ok(())
}

fn is_numeric(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    !(integer.is_empty() && fraction.is_empty())
        && integer.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit())
}

/// Normalizes numeric key values so that equal numbers produce equal keys.
fn canonical_key(table: &TableSpec, key: &[Field]) -> Vec<Field> {
    table
        .key_columns()
        .zip(key)
        .map(|(column, value)| match (column.column_type, value) {
            (ColumnType::Numeric, Some(value)) if is_numeric(value) => {
                Some(canonical_numeric(value))
            }
            _ => value.clone(),
        })
        .collect()
}

fn canonical_numeric(value: &str) -> String {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let integer = integer.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');

    let mut canonical = String::with_capacity(value.len());
    if negative && !(integer.is_empty() && fraction.is_empty()) {
        canonical.push('-');
    }
    canonical.push_str(if integer.is_empty() { "0" } else { integer });
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }

    canonical
}
