use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// The target schema name is empty.
    #[error("`import.schema` cannot be empty")]
    EmptySchema,
    /// The field delimiter would collide with record content.
    #[error("`import.delimiter` must not be alphanumeric or whitespace, got `{0}`")]
    InvalidDelimiter(char),
}
