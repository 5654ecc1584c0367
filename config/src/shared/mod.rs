//! Configuration types shared by the importer crates.

mod base;
mod connection;
mod importer;

pub use base::ValidationError;
pub use connection::{DefaultPgConnectionOptions, IntoConnectOptions, PgConnectionConfig, TlsConfig};
pub use importer::{ImportConfig, ImporterConfig, MissingFilePolicy};
