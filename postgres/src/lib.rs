//! Postgres plumbing shared by the importer crates.

pub mod schema;
#[cfg(feature = "sqlx")]
pub mod sqlx;
pub mod tokio;
pub mod version;
