use config::shared::{PgConnectionConfig, TlsConfig};
use postgres::sqlx::test_utils::{create_pg_database, drop_pg_database};
use uuid::Uuid;

use crate::store::postgres::PostgresStore;

/// Schema the reference tables are created in during tests.
pub const TEST_SCHEMA: &str = "correios_test";

/// Connection settings for a uniquely named test database.
///
/// Configuration is read from environment variables:
/// - `TESTS_DATABASE_HOST`: Postgres server hostname
/// - `TESTS_DATABASE_PORT`: Postgres server port, defaults to `5432`
/// - `TESTS_DATABASE_USERNAME`: Database user, defaults to `postgres`
/// - `TESTS_DATABASE_PASSWORD`: Database password (optional)
///
/// Returns `None` when `TESTS_DATABASE_HOST` is not set.
pub fn local_pg_connection_config() -> Option<PgConnectionConfig> {
    let host = std::env::var("TESTS_DATABASE_HOST").ok()?;

    Some(PgConnectionConfig {
        host,
        port: std::env::var("TESTS_DATABASE_PORT")
            .ok()
            .map(|port| {
                port.parse()
                    .expect("TESTS_DATABASE_PORT must be a valid port number")
            })
            .unwrap_or(5432),
        name: Uuid::new_v4().to_string(),
        username: std::env::var("TESTS_DATABASE_USERNAME")
            .unwrap_or_else(|_| "postgres".to_string()),
        password: std::env::var("TESTS_DATABASE_PASSWORD")
            .ok()
            .map(Into::into),
        tls: TlsConfig {
            trusted_root_certs: String::new(),
            enabled: false,
        },
        connect_timeout_ms: PgConnectionConfig::DEFAULT_CONNECT_TIMEOUT_MS,
    })
}

/// A freshly created database and a store connected to it.
pub struct TestDatabase {
    pub config: PgConnectionConfig,
    pub store: PostgresStore,
}

impl TestDatabase {
    /// Drops the database. Failures are printed, not raised.
    pub async fn cleanup(self) {
        drop(self.store);
        drop_pg_database(&self.config).await;
    }
}

/// Creates a new database with a random name and connects a [`PostgresStore`] to it.
///
/// Returns `None` when no test server is configured.
///
/// # Panics
///
/// Panics if the database cannot be created or connected to.
pub async fn spawn_test_database() -> Option<TestDatabase> {
    let config = local_pg_connection_config()?;

    let pool = create_pg_database(&config).await;
    pool.close().await;

    let store = PostgresStore::connect(&config, TEST_SCHEMA)
        .await
        .expect("Failed to connect to the test database");

    Some(TestDatabase { config, store })
}
