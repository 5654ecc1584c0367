//! Per-file import of snapshot and delta files.
//!
//! Both loaders read their file line by line and await every store call before reading the next
//! line, so the operations of one file are applied in file order.

mod bulk;
mod delta;

pub use bulk::load_snapshot_file;
pub use delta::apply_delta_file;

pub use crate::report::FileReport;

use crate::error::ImportError;
use crate::import_error;

/// Wraps `err` with the file and line it was raised for, keeping its kind.
fn line_error(err: ImportError, file_name: &str, line: u64) -> ImportError {
    let mut detail = format!("{file_name} line {line}");
    if let Some(description) = err.description() {
        detail.push_str(": ");
        detail.push_str(description);
    }
    if let Some(inner) = err.detail() {
        detail.push_str(": ");
        detail.push_str(inner);
    }

    import_error!(err.kind(), "Failed to import line", detail, source: err)
}
