mod connect;

pub use connect::{ConnectError, PgConnection, connect};
