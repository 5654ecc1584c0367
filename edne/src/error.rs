//! Error types for import operations.
//!
//! [`ImportError`] carries a classified [`ErrorKind`], a static description, optional dynamic
//! detail, an optional source error and the caller location. Failures of concurrently running
//! file tasks are folded into a single aggregated error.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Result type used across the crate.
pub type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type of the importer.
#[derive(Debug, Clone)]
pub struct ImportError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    /// Failures collected from a group of file tasks.
    Many {
        errors: Vec<ImportError>,
        location: &'static Location<'static>,
    },
}

/// Categories of import failures.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Input file errors
    UnsupportedOperation,
    InvalidData,
    MissingFile,
    IoError,
    ConversionError,

    // Store errors
    StoreConnectionFailed,
    StoreQueryFailed,
    StoreSchemaError,
    ConstraintViolation,
    AuthenticationError,
    EncryptionError,

    // Configuration errors
    ConfigError,

    // Runtime errors
    InvalidState,
    TaskPanic,

    Unknown,
}

impl ImportError {
    /// Returns the kind of this error, or of the first aggregated error.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns every kind present in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the static description, or the first one of an aggregate.
    pub fn description(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.description.as_ref()),
            ErrorRepr::Many { ref errors, .. } => errors.first().and_then(|e| e.description()),
        }
    }

    /// Returns the dynamic detail if one was attached.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace, not available for aggregates.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns where the error was created.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Number of leaf errors, 1 for a single error.
    pub fn error_count(&self) -> usize {
        match self.repr {
            ErrorRepr::Single(_) => 1,
            ErrorRepr::Many { ref errors, .. } => errors.iter().map(|e| e.error_count()).sum(),
        }
    }

    /// Attaches the originating error. Ignored on aggregates.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        ImportError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for ImportError {
    fn eq(&self, other: &ImportError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                write_detail(payload.detail.as_deref(), f, 1)?;
                write_backtrace(payload.backtrace.as_ref(), f, 1)
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = error.to_string();
                    let mut lines = rendered.lines();
                    match lines.next() {
                        Some(first_line) => write!(f, "\n  {}. {}", index + 1, first_line)?,
                        None => write!(f, "\n  {}.", index + 1)?,
                    }

                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for ImportError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source.as_ref() as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

fn write_backtrace(backtrace: &Backtrace, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = backtrace.to_string();
    if !rendered_backtrace.trim().is_empty() && !rendered_backtrace.contains("disabled backtrace") {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            write!(f, "\n{indent_str}  {line}")?;
        }
    }

    Ok(())
}

fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        write!(f, "\n{indent_str}Detail:")?;
        for line in detail.lines() {
            write!(f, "\n{indent_str}  {line}")?;
        }
    }

    Ok(())
}

impl From<(ErrorKind, &'static str)> for ImportError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> ImportError {
        ImportError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for ImportError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> ImportError {
        ImportError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates errors. A single error is returned unwrapped.
impl<E> From<Vec<E>> for ImportError
where
    E: Into<ImportError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> ImportError {
        let location = Location::caller();

        let mut errors: Vec<ImportError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }

        ImportError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

impl From<std::io::Error> for ImportError {
    #[track_caller]
    fn from(err: std::io::Error) -> ImportError {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::MissingFile,
            _ => ErrorKind::IoError,
        };

        let detail = err.to_string();
        ImportError::from_components(
            kind,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Classifies Postgres failures by SQLSTATE class.
impl From<tokio_postgres::Error> for ImportError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> ImportError {
        use tokio_postgres::error::SqlState;

        let (kind, description) = match err.code() {
            Some(sqlstate) => match *sqlstate {
                SqlState::INVALID_AUTHORIZATION_SPECIFICATION | SqlState::INVALID_PASSWORD => (
                    ErrorKind::AuthenticationError,
                    "PostgreSQL authentication failed",
                ),
                SqlState::INSUFFICIENT_PRIVILEGE => (
                    ErrorKind::AuthenticationError,
                    "PostgreSQL permission denied",
                ),
                SqlState::UNDEFINED_TABLE
                | SqlState::UNDEFINED_COLUMN
                | SqlState::INVALID_SCHEMA_NAME => (
                    ErrorKind::StoreSchemaError,
                    "PostgreSQL schema object not found",
                ),
                SqlState::CANNOT_CONNECT_NOW
                | SqlState::ADMIN_SHUTDOWN
                | SqlState::CRASH_SHUTDOWN
                | SqlState::TOO_MANY_CONNECTIONS
                | SqlState::IDLE_SESSION_TIMEOUT => (
                    ErrorKind::StoreConnectionFailed,
                    "PostgreSQL connection lost",
                ),
                _ => match sqlstate.code().get(..2) {
                    Some("08") => (
                        ErrorKind::StoreConnectionFailed,
                        "PostgreSQL connection failed",
                    ),
                    Some("23") => (
                        ErrorKind::ConstraintViolation,
                        "PostgreSQL constraint violation",
                    ),
                    Some("22") => (
                        ErrorKind::ConversionError,
                        "PostgreSQL data conversion failed",
                    ),
                    Some("42") => (
                        ErrorKind::StoreQueryFailed,
                        "PostgreSQL syntax or access error",
                    ),
                    _ => (ErrorKind::StoreQueryFailed, "PostgreSQL error"),
                },
            },
            // No SQLSTATE means the failure happened below the protocol level.
            None => (
                ErrorKind::StoreConnectionFailed,
                "PostgreSQL connection failed",
            ),
        };

        let detail = err.to_string();
        ImportError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<postgres::tokio::ConnectError> for ImportError {
    #[track_caller]
    fn from(err: postgres::tokio::ConnectError) -> ImportError {
        use postgres::tokio::ConnectError;

        let (kind, description) = match &err {
            ConnectError::Postgres(err) if err.code().is_some() => {
                (ErrorKind::AuthenticationError, "PostgreSQL rejected the connection")
            }
            ConnectError::Postgres(_) => (
                ErrorKind::StoreConnectionFailed,
                "PostgreSQL connection failed",
            ),
            ConnectError::Certificates(_) => {
                (ErrorKind::ConfigError, "Trusted root certificates are invalid")
            }
            ConnectError::Tls(_) => (ErrorKind::EncryptionError, "TLS configuration failed"),
        };

        let detail = err.to_string();
        ImportError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<tokio::task::JoinError> for ImportError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> ImportError {
        let (kind, description) = if err.is_panic() {
            (ErrorKind::TaskPanic, "File task panicked")
        } else {
            (ErrorKind::InvalidState, "File task was cancelled")
        };

        let detail = err.to_string();
        ImportError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, import_error};

    fn failing() -> ImportResult<()> {
        bail!(
            ErrorKind::UnsupportedOperation,
            "Unsupported operation code",
            "XYZ"
        );
    }

    #[test]
    fn bail_returns_error_with_detail() {
        let err = failing().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert_eq!(err.description(), Some("Unsupported operation code"));
        assert_eq!(err.detail(), Some("XYZ"));
        assert!(err.location().file().ends_with("error.rs"));
    }

    #[test]
    fn error_with_source_keeps_cause() {
        let cause = import_error!(ErrorKind::ConversionError, "Invalid numeric value");
        let err = import_error!(
            ErrorKind::ConversionError,
            "Failed to import line",
            "LOG_BAIRRO.TXT line 3",
            source: cause
        );

        assert_eq!(err.detail(), Some("LOG_BAIRRO.TXT line 3"));
        let source = error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("Invalid numeric value"));
    }

    #[test]
    fn single_error_vec_is_not_wrapped() {
        let err = ImportError::from(vec![import_error!(
            ErrorKind::MissingFile,
            "File not found"
        )]);

        assert_eq!(err.error_count(), 1);
        assert!(!err.to_string().starts_with("[Many]"));
    }

    #[test]
    fn aggregated_errors_keep_every_kind() {
        let err = ImportError::from(vec![
            import_error!(ErrorKind::InvalidData, "Bad line"),
            import_error!(ErrorKind::ConstraintViolation, "Null key"),
        ]);

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::InvalidData, ErrorKind::ConstraintViolation]
        );
        assert_eq!(err.error_count(), 2);

        let rendered = err.to_string();
        assert!(rendered.starts_with("[Many] 2 errors aggregated"));
        assert!(rendered.contains("1. [InvalidData] Bad line"));
        assert!(rendered.contains("2. [ConstraintViolation] Null key"));
    }

    #[test]
    fn missing_io_file_maps_to_missing_file() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ImportError::from(io_err);

        assert_eq!(err.kind(), ErrorKind::MissingFile);
        assert!(error::Error::source(&err).is_some());
    }
}
