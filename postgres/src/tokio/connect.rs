use std::io::BufReader;
use std::num::NonZeroI32;

use config::shared::{IntoConnectOptions, PgConnectionConfig};
use rustls::ClientConfig;
use thiserror::Error;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::{Client, Config, Connection, NoTls, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{Instrument, error, info};

use crate::version::extract_server_version;

/// Errors raised while opening a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect to postgres: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("failed to read trusted root certificates: {0}")]
    Certificates(#[from] std::io::Error),

    #[error("failed to register trusted root certificate: {0}")]
    Tls(#[from] rustls::Error),
}

/// An open client plus the version the server reported at startup.
#[derive(Debug)]
pub struct PgConnection {
    pub client: Client,
    pub server_version: Option<NonZeroI32>,
}

/// Connects to the configured database, using TLS when enabled.
///
/// The connection future is driven by a background task that lives as long as the returned
/// [`Client`].
pub async fn connect(
    pg_connection_config: &PgConnectionConfig,
) -> Result<PgConnection, ConnectError> {
    match pg_connection_config.tls.enabled {
        true => connect_tls(pg_connection_config).await,
        false => connect_no_tls(pg_connection_config).await,
    }
}

async fn connect_no_tls(
    pg_connection_config: &PgConnectionConfig,
) -> Result<PgConnection, ConnectError> {
    let config: Config = pg_connection_config.with_db();
    let (client, connection) = config.connect(NoTls).await?;

    let server_version = connection
        .parameter("server_version")
        .and_then(extract_server_version);

    spawn_postgres_connection::<NoTls>(connection);

    info!(
        host = %pg_connection_config.host,
        database = %pg_connection_config.name,
        "connected to postgres without tls"
    );

    Ok(PgConnection {
        client,
        server_version,
    })
}

async fn connect_tls(
    pg_connection_config: &PgConnectionConfig,
) -> Result<PgConnection, ConnectError> {
    let config: Config = pg_connection_config.with_db();

    let mut root_store = rustls::RootCertStore::empty();
    let mut root_certs_reader =
        BufReader::new(pg_connection_config.tls.trusted_root_certs.as_bytes());
    for cert in rustls_pemfile::certs(&mut root_certs_reader) {
        let cert = cert?;
        root_store.add(cert)?;
    }

    let tls_config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let (client, connection) = config.connect(MakeRustlsConnect::new(tls_config)).await?;

    let server_version = connection
        .parameter("server_version")
        .and_then(extract_server_version);

    spawn_postgres_connection::<MakeRustlsConnect>(connection);

    info!(
        host = %pg_connection_config.host,
        database = %pg_connection_config.name,
        "connected to postgres with tls"
    );

    Ok(PgConnection {
        client,
        server_version,
    })
}

/// Drives `connection` on a background task until it terminates.
fn spawn_postgres_connection<T>(connection: Connection<Socket, T::Stream>)
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let span = tracing::Span::current();
    let task = async move {
        match connection.await {
            Err(err) => error!("an error occurred during the postgres connection: {}", err),
            Ok(()) => info!("postgres connection terminated"),
        }
    }
    .instrument(span);

    // Dropping the client closes the connection, so the handle is not kept.
    tokio::spawn(task);
}
