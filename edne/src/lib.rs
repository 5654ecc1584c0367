//! Loads the Correios eDNE reference files into a store.
//!
//! An import runs in two phases. The snapshot phase upserts every row of the full (`basico`)
//! files, one task per file. The delta phase then applies the `INS`, `UPD` and `DEL` lines of
//! the delta files in file order. See [`pipeline::Importer`].

mod macros;

pub mod error;
pub mod file;
pub mod load;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod store;
pub mod tables;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
