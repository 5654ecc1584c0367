//! Parsing of delimited eDNE lines into positional records.

use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, ImportResult};
use crate::tables::{DeltaTrailer, TableSpec};

/// One field value. `None` is an absent value and is stored as `NULL`.
pub type Field = Option<String>;

/// Positional data fields of one line, with every control field removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|field| field.as_deref())
    }

    /// Projects the primary key of `table`, in key order.
    pub fn key(&self, table: &TableSpec) -> Vec<Field> {
        table
            .primary_key
            .iter()
            .map(|&index| self.fields.get(index).cloned().flatten())
            .collect()
    }
}

/// Operation carried by the control field of a delta line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Parses an operation code. Accepts `INS`, `UPD`, `DEL` and their long forms, upper case
    /// only.
    pub fn parse(code: &str) -> ImportResult<Self> {
        match code {
            "INS" | "INSERT" => Ok(Operation::Insert),
            "UPD" | "UPDATE" => Ok(Operation::Update),
            "DEL" | "DELETE" => Ok(Operation::Delete),
            _ => bail!(
                ErrorKind::UnsupportedOperation,
                "Unsupported operation code",
                format!("operation code `{code}` is not one of INS, UPD or DEL")
            ),
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Operation::Insert => "INS",
            Operation::Update => "UPD",
            Operation::Delete => "DEL",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaLine {
    pub operation: Operation,
    pub record: Record,
}

/// Splits a line on `delimiter` after dropping a trailing carriage return.
pub fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.split(delimiter).collect()
}

/// Trims a raw field. Empty fields become `None`.
pub fn normalize_field(raw: &str) -> Field {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a snapshot line, where every field is a data field.
pub fn parse_snapshot_line(table: &TableSpec, line: &str, delimiter: char) -> ImportResult<Record> {
    let fields: Vec<Field> = split_fields(line, delimiter)
        .into_iter()
        .map(normalize_field)
        .collect();

    check_field_count(table, fields.len())?;

    Ok(Record::new(fields))
}

/// Parses a delta line according to the trailer layout of `table`.
///
/// The operation code is validated before anything else, so a line with an unknown code fails
/// with [`ErrorKind::UnsupportedOperation`] even when its field count is also wrong.
pub fn parse_delta_line(table: &TableSpec, line: &str, delimiter: char) -> ImportResult<DeltaLine> {
    let raw = split_fields(line, delimiter);
    let trailer = table.delta_trailer();
    let control_fields = trailer.control_fields();

    if raw.len() <= control_fields {
        bail!(
            ErrorKind::InvalidData,
            "Delta line has too few fields",
            format!(
                "table {} expects {} data fields and {} control fields, found {} fields",
                table.name,
                table.columns.len(),
                control_fields,
                raw.len()
            )
        );
    }

    let data_end = raw.len() - control_fields;
    let operation = Operation::parse(raw[data_end])?;

    let mut fields: Vec<Field> = raw[..data_end]
        .iter()
        .map(|raw| normalize_field(raw))
        .collect();

    let extra = raw.get(data_end + 1).and_then(|raw| normalize_field(raw));
    if trailer == DeltaTrailer::TrailingColumn {
        fields.push(extra.clone());
    }

    check_field_count(table, fields.len())?;

    if let DeltaTrailer::ReplacementValue { column } = trailer {
        // An empty replacement keeps the positional value.
        if operation == Operation::Update && extra.is_some() {
            fields[column] = extra;
        }
    }

    Ok(DeltaLine {
        operation,
        record: Record::new(fields),
    })
}

fn check_field_count(table: &TableSpec, actual: usize) -> ImportResult<()> {
    let expected = table.columns.len();
    if actual != expected {
        bail!(
            ErrorKind::InvalidData,
            "Unexpected number of fields",
            format!(
                "table {} expects {expected} fields, found {actual}",
                table.name
            )
        );
    }

    Ok(())
}
